use ndarray::Array2;
use tracing::info;

use crate::asn::AsnRecord;
use crate::background::subtract_background;
use crate::cosmic::{reconcile, CosmicRayDetector};
use crate::cube::ReadCube;
use crate::error::Result;
use crate::exposure::Exposure;
use crate::extract::extract;
use crate::frame::trim_plane;
use crate::mask::{SourceList, SourceMaskProvider};
use crate::store::FrameStore;

use super::config::ReductionConfig;
use super::types::{ProgressReporter, ReductionStage};

/// Everything a caller needs to hand the run off to the external alignment
/// stage (or to inspect what happened).
#[derive(Clone, Debug)]
pub struct ReductionSummary {
    pub root: String,
    /// Difference-frame artifact names, ascending pair order.
    pub frames: Vec<String>,
    /// Recorded sky level per frame, same order.
    pub sky_levels: Vec<f32>,
    /// Per-frame source catalogs for the aligner.
    pub catalogs: Vec<SourceList>,
    pub cr_flagged: usize,
    pub cr_cleared: usize,
    pub asn: AsnRecord,
}

/// Run the full read-differencing reduction for one exposure.
///
/// Stages run strictly in order; each difference frame is an independent
/// unit once extracted, and the store sees it only at two checkpoints
/// (after extraction, after flag reconciliation) plus the final association
/// write. A failure anywhere aborts the run for this root.
pub fn run_reduction(
    exposure: &Exposure,
    flat: &Array2<f32>,
    masks: &dyn SourceMaskProvider,
    detector: &dyn CosmicRayDetector,
    store: &mut dyn FrameStore,
    config: &ReductionConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ReductionSummary> {
    exposure.validate()?;
    let root = exposure.meta.root.clone();
    info!(root = %root, nsamp = exposure.meta.nsamp, "starting reduction");

    let cube = ReadCube::from_exposure(exposure)?;

    // Extraction, then the first persistence checkpoint.
    reporter.begin_stage(ReductionStage::Splitting, Some(cube.pair_count()));
    let mut frames = extract(&cube, flat, &root)?;
    for (done, frame) in frames.iter().enumerate() {
        store.save(frame)?;
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Masks: one shared exposure mask plus a catalog per frame.
    reporter.begin_stage(ReductionStage::SourceMasking, Some(frames.len()));
    let deepest = trim_plane(cube.deepest_read());
    let exposure_mask = masks.exposure_mask(&root, &deepest)?;
    let mut catalogs = Vec::with_capacity(frames.len());
    for (done, frame) in frames.iter().enumerate() {
        let frame_mask = masks.frame_mask(&root, frame.index, &frame.sci)?;
        catalogs.push(SourceList::from_mask(&frame.name(), &frame_mask, &frame.sci)?);
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Background, per frame against the shared mask.
    reporter.begin_stage(ReductionStage::Background, Some(frames.len()));
    let mut sky_levels = Vec::with_capacity(frames.len());
    for (done, frame) in frames.iter_mut().enumerate() {
        let report = subtract_background(frame, &exposure_mask, None, &config.background)?;
        sky_levels.push(report.sky_level);
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Cosmic rays: one detection on the deepest read, reconciled across all
    // frames, then the second persistence checkpoint.
    reporter.begin_stage(ReductionStage::CosmicRays, Some(frames.len()));
    let cr_mask = detector.detect(&deepest, &config.detector)?;
    let cr_report = reconcile(&mut frames, &exposure_mask, &cr_mask, &config.cosmic)?;
    reporter.finish_stage();

    reporter.begin_stage(ReductionStage::Writing, Some(frames.len()));
    for (done, frame) in frames.iter().enumerate() {
        store.update(frame)?;
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Association manifest for the alignment stage.
    reporter.begin_stage(ReductionStage::Association, None);
    let names: Vec<String> = frames.iter().map(|f| f.name()).collect();
    let asn = AsnRecord::build(&names, &root);
    store.save_asn(&asn)?;
    reporter.finish_stage();

    info!(
        root = %root,
        frames = names.len(),
        flagged = cr_report.total_flagged(),
        cleared = cr_report.total_cleared(),
        "reduction complete"
    );

    Ok(ReductionSummary {
        root,
        frames: names,
        sky_levels,
        catalogs,
        cr_flagged: cr_report.total_flagged(),
        cr_cleared: cr_report.total_cleared(),
        asn,
    })
}
