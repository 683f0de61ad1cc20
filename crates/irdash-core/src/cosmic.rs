//! Cosmic-ray reconciliation: merging an external detector's mask into the
//! per-frame DQ planes without trampling real sources.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{DEFAULT_FAINT_LIMIT, DEFAULT_REGION_MAX_ROW, DEFAULT_REGION_MIN_COL};
use crate::dq;
use crate::error::{DashError, Result};
use crate::frame::DiffFrame;
use crate::mask::SourceMask;

/// Knobs recognized by the external cosmic-ray detector. Replaces the loose
/// keyword bag the detector's native interface takes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorParams {
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default = "default_readnoise")]
    pub readnoise: f32,
    /// Object-detection limit: contrast above which a structure is treated
    /// as a real source rather than a ray.
    #[serde(default = "default_objlim")]
    pub objlim: f32,
    /// Sky pedestal level already subtracted from the input.
    #[serde(default)]
    pub pssl: f32,
    #[serde(default)]
    pub verbose: bool,
}

fn default_gain() -> f32 {
    1.0
}
fn default_readnoise() -> f32 {
    20.0
}
fn default_objlim() -> f32 {
    15.0
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            readnoise: 20.0,
            objlim: 15.0,
            pssl: 0.0,
            verbose: false,
        }
    }
}

/// External cosmic-ray identification, run once per root against the deepest
/// available read. The pipeline never reimplements the detection itself.
pub trait CosmicRayDetector {
    fn detect(&self, sci: &Array2<f32>, params: &DetectorParams) -> Result<Array2<bool>>;
}

/// Detector double returning a precomputed mask (e.g. loaded from the file
/// collaborator, or fixed in tests).
pub struct StaticCrDetector {
    mask: Array2<bool>,
}

impl StaticCrDetector {
    pub fn new(mask: Array2<bool>) -> StaticCrDetector {
        StaticCrDetector { mask }
    }

    /// All-clear detector of the given shape.
    pub fn none(shape: (usize, usize)) -> StaticCrDetector {
        StaticCrDetector {
            mask: Array2::from_elem(shape, false),
        }
    }
}

impl CosmicRayDetector for StaticCrDetector {
    fn detect(&self, sci: &Array2<f32>, _params: &DetectorParams) -> Result<Array2<bool>> {
        if self.mask.dim() != sci.dim() {
            return Err(DashError::ShapeMismatch {
                expected: sci.dim(),
                actual: self.mask.dim(),
            });
        }
        Ok(self.mask.clone())
    }
}

/// Detector sub-region eligible for newly-set flags: columns strictly greater
/// than `min_col` and rows strictly less than `max_row`. The default bounds
/// describe one corner of the array affected by a calibration-specific glow
/// artifact; they are empirically derived, not physically general.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorRegion {
    #[serde(default = "default_min_col")]
    pub min_col: usize,
    #[serde(default = "default_max_row")]
    pub max_row: usize,
}

fn default_min_col() -> usize {
    DEFAULT_REGION_MIN_COL
}
fn default_max_row() -> usize {
    DEFAULT_REGION_MAX_ROW
}

impl Default for DetectorRegion {
    fn default() -> Self {
        Self {
            min_col: DEFAULT_REGION_MIN_COL,
            max_row: DEFAULT_REGION_MAX_ROW,
        }
    }
}

impl DetectorRegion {
    pub fn contains(&self, y: usize, x: usize) -> bool {
        x > self.min_col && y < self.max_row
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CosmicConfig {
    #[serde(default)]
    pub region: DetectorRegion,
    /// In-source pixels below this science rate may still be flagged.
    #[serde(default = "default_faint_limit")]
    pub faint_limit: f32,
    /// Also run the reconciliation passes for this user-chosen flag bit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<u16>,
    /// Request the custom-bit passes. Requires `custom` to be set.
    #[serde(default)]
    pub remove_custom: bool,
}

fn default_faint_limit() -> f32 {
    DEFAULT_FAINT_LIMIT
}

impl Default for CosmicConfig {
    fn default() -> Self {
        Self {
            region: DetectorRegion::default(),
            faint_limit: DEFAULT_FAINT_LIMIT,
            custom: None,
            remove_custom: false,
        }
    }
}

/// Per-frame tallies of one reconciliation run.
#[derive(Clone, Debug, Default)]
pub struct FrameCosmicStats {
    pub index: usize,
    pub cleared: usize,
    pub flagged: usize,
}

#[derive(Clone, Debug, Default)]
pub struct CosmicReport {
    pub per_frame: Vec<FrameCosmicStats>,
}

impl CosmicReport {
    pub fn total_cleared(&self) -> usize {
        self.per_frame.iter().map(|f| f.cleared).sum()
    }

    pub fn total_flagged(&self) -> usize {
        self.per_frame.iter().map(|f| f.flagged).sum()
    }
}

/// Reconcile the external detector's mask with every frame's DQ plane.
///
/// Two passes per frame and per target bit, in order:
///
/// 1. clear the bit wherever it is set inside a source footprint (bright
///    cores routinely masquerade as rays);
/// 2. set the bit where the detector fired, the bit is absent, the pixel is
///    sky (or in-source but essentially unexposed), and the pixel falls in
///    the configured detector sub-region.
///
/// The same shared mask and detector output apply to all frames of the root.
/// Requesting the custom-bit passes without naming the bit is a
/// [`DashError::Configuration`].
pub fn reconcile(
    frames: &mut [DiffFrame],
    exposure_mask: &SourceMask,
    cr_mask: &Array2<bool>,
    config: &CosmicConfig,
) -> Result<CosmicReport> {
    let mut bits = vec![dq::CR];
    if config.remove_custom {
        match config.custom {
            Some(bit) => bits.push(bit),
            None => {
                return Err(DashError::Configuration(
                    "custom flag removal requested without a flag bit".into(),
                ))
            }
        }
    }

    let mut report = CosmicReport::default();
    for frame in frames.iter_mut() {
        let shape = frame.shape();
        if exposure_mask.shape() != shape {
            return Err(DashError::ShapeMismatch {
                expected: shape,
                actual: exposure_mask.shape(),
            });
        }
        if cr_mask.dim() != shape {
            return Err(DashError::ShapeMismatch {
                expected: shape,
                actual: cr_mask.dim(),
            });
        }

        let mut stats = FrameCosmicStats {
            index: frame.index,
            ..Default::default()
        };
        for &bit in &bits {
            let (cleared, flagged) = reconcile_bit(frame, exposure_mask, cr_mask, bit, config);
            stats.cleared += cleared;
            stats.flagged += flagged;
        }
        debug!(
            frame = %frame.name(),
            cleared = stats.cleared,
            flagged = stats.flagged,
            "cosmic-ray flags reconciled"
        );
        report.per_frame.push(stats);
    }

    info!(
        frames = report.per_frame.len(),
        cleared = report.total_cleared(),
        flagged = report.total_flagged(),
        "cosmic-ray reconciliation complete"
    );
    Ok(report)
}

fn reconcile_bit(
    frame: &mut DiffFrame,
    seg: &SourceMask,
    cr_mask: &Array2<bool>,
    bit: u16,
    config: &CosmicConfig,
) -> (usize, usize) {
    let mut cleared = 0usize;
    dq::clear_where(&mut frame.dq, bit, |y, x, v| {
        let hit = v & bit != 0 && seg.is_source(y, x);
        if hit {
            cleared += 1;
        }
        hit
    });

    // The set pass runs over the already-cleared plane, matching the
    // read-modify-write order of the original file-based flow.
    let mut flagged = 0usize;
    let sci = &frame.sci;
    dq::set_where(&mut frame.dq, bit, |y, x, v| {
        let hit = cr_mask[[y, x]]
            && v & bit == 0
            && (!seg.is_source(y, x) || sci[[y, x]] < config.faint_limit)
            && config.region.contains(y, x);
        if hit {
            flagged += 1;
        }
        hit
    });

    (cleared, flagged)
}
