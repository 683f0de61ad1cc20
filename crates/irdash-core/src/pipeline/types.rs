/// Reduction stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum ReductionStage {
    Splitting,
    SourceMasking,
    Background,
    CosmicRays,
    Association,
    Writing,
}

impl std::fmt::Display for ReductionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Splitting => write!(f, "Splitting reads"),
            Self::SourceMasking => write!(f, "Masking sources"),
            Self::Background => write!(f, "Subtracting background"),
            Self::CosmicRays => write!(f, "Reconciling cosmic rays"),
            Self::Association => write!(f, "Building association"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the reduction.
///
/// Implementors can drive progress bars or logging; all methods default to
/// no-ops.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g. frame count), if known.
    fn begin_stage(&self, _stage: ReductionStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op reporter for callers that do not track progress.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
