//! Robust sky-background estimation and one-shot subtraction.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    DEFAULT_EDGE_MARGIN, DEFAULT_ERR_CLIP, DEFAULT_MEDIAN_CAP, DEFAULT_RATE_FLOOR,
    DEFAULT_SCI_CLIP,
};
use crate::dq;
use crate::error::{DashError, Result};
use crate::frame::DiffFrame;
use crate::mask::SourceMask;
use crate::stats::{masked_values, median, percentile_range};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackgroundParams {
    /// Subtract the sky model from the science plane. The sky level is
    /// recorded in the frame either way.
    #[serde(default = "default_true")]
    pub subtract: bool,
    /// Clear cosmic-ray flags inside sources using a caller-supplied blotted
    /// mask. No-op when that mask is absent.
    #[serde(default)]
    pub reset_flagged_in_sources: bool,
    /// Pixels within this distance of any frame edge are never candidates.
    #[serde(default = "default_edge_margin")]
    pub edge_margin: usize,
    /// Candidates must have science rate above this floor.
    #[serde(default = "default_rate_floor")]
    pub rate_floor: f32,
    /// Candidates above this multiple of the candidate median are rejected
    /// before percentile clipping.
    #[serde(default = "default_median_cap")]
    pub median_cap: f32,
    /// Percentile window kept on the science plane.
    #[serde(default = "default_sci_clip")]
    pub sci_clip: (f64, f64),
    /// Percentile window kept on the error plane.
    #[serde(default = "default_err_clip")]
    pub err_clip: (f64, f64),
}

fn default_true() -> bool {
    true
}
fn default_edge_margin() -> usize {
    DEFAULT_EDGE_MARGIN
}
fn default_rate_floor() -> f32 {
    DEFAULT_RATE_FLOOR
}
fn default_median_cap() -> f32 {
    DEFAULT_MEDIAN_CAP
}
fn default_sci_clip() -> (f64, f64) {
    DEFAULT_SCI_CLIP
}
fn default_err_clip() -> (f64, f64) {
    DEFAULT_ERR_CLIP
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            subtract: true,
            reset_flagged_in_sources: false,
            edge_margin: DEFAULT_EDGE_MARGIN,
            rate_floor: DEFAULT_RATE_FLOOR,
            median_cap: DEFAULT_MEDIAN_CAP,
            sci_clip: DEFAULT_SCI_CLIP,
            err_clip: DEFAULT_ERR_CLIP,
        }
    }
}

/// Outcome of one background pass over a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundReport {
    pub sky_level: f32,
    /// The model was subtracted during this call.
    pub subtracted: bool,
    /// The frame already carried the subtraction marker; the science plane
    /// was left alone.
    pub already_subtracted: bool,
}

/// Robust sky estimate over the non-source pixels of a frame.
///
/// The candidate set starts from sky pixels with clean DQ, plausible rate,
/// and distance from the detector edges, then shrinks through a median cap
/// and two percentile clips (science, then error) before the final median.
/// An empty candidate set at any step is a [`DashError::DataQuality`]; the
/// statistic is never allowed to go undefined silently.
pub fn estimate_background(
    frame: &DiffFrame,
    exposure_mask: &SourceMask,
    params: &BackgroundParams,
) -> Result<f32> {
    let (h, w) = frame.shape();
    if exposure_mask.shape() != (h, w) {
        return Err(DashError::ShapeMismatch {
            expected: (h, w),
            actual: exposure_mask.shape(),
        });
    }

    let m = params.edge_margin;
    let mut cand = Array2::from_shape_fn((h, w), |(y, x)| {
        !exposure_mask.is_source(y, x)
            && frame.dq[[y, x]] == 0
            && frame.sci[[y, x]] > params.rate_floor
            && y > m
            && x > m
            && h > m
            && w > m
            && y < h - m
            && x < w - m
    });

    let mut vals = masked_values(&frame.sci, &cand);
    let med = median(&mut vals).ok_or_else(|| empty_mask_error(frame, "initial candidates"))?;

    // Reject gross outliers before trusting percentiles.
    let cap = params.median_cap * med;
    narrow(&mut cand, |y, x| frame.sci[[y, x]] < cap);

    let mut vals = masked_values(&frame.sci, &cand);
    let (lo, hi) = percentile_range(&mut vals, params.sci_clip.0, params.sci_clip.1)
        .ok_or_else(|| empty_mask_error(frame, "science clip"))?;
    narrow(&mut cand, |y, x| {
        frame.sci[[y, x]] >= lo && frame.sci[[y, x]] <= hi
    });

    let mut evals = masked_values(&frame.err, &cand);
    let (elo, ehi) = percentile_range(&mut evals, params.err_clip.0, params.err_clip.1)
        .ok_or_else(|| empty_mask_error(frame, "error clip"))?;
    narrow(&mut cand, |y, x| {
        frame.err[[y, x]] >= elo && frame.err[[y, x]] <= ehi
    });

    let mut vals = masked_values(&frame.sci, &cand);
    let sky = median(&mut vals).ok_or_else(|| empty_mask_error(frame, "final candidates"))?;

    debug!(
        frame = %frame.name(),
        candidates = vals.len(),
        sky,
        "sky level estimated"
    );
    Ok(sky)
}

/// Estimate the sky level and apply the constant background model to one
/// difference frame.
///
/// The sky level is stamped into the frame unconditionally, for provenance.
/// Subtraction happens at most once per frame: a second call with the
/// marker already set reports `already_subtracted` and leaves the science
/// plane untouched.
///
/// `blotted` is the resampled source mask for the optional in-source
/// cosmic-ray reset; when absent that step is a no-op.
pub fn subtract_background(
    frame: &mut DiffFrame,
    exposure_mask: &SourceMask,
    blotted: Option<&SourceMask>,
    params: &BackgroundParams,
) -> Result<BackgroundReport> {
    let sky = estimate_background(frame, exposure_mask, params)?;
    frame.sky = Some(sky);

    let mut report = BackgroundReport {
        sky_level: sky,
        subtracted: false,
        already_subtracted: false,
    };

    if params.subtract {
        if frame.bg_subtracted {
            info!(frame = %frame.name(), "background already subtracted, skipping");
            report.already_subtracted = true;
        } else {
            frame.sci.mapv_inplace(|v| v - sky);
            frame.bg_subtracted = true;
            report.subtracted = true;
            info!(frame = %frame.name(), sky, "background subtracted");
        }
    }

    if params.reset_flagged_in_sources {
        match blotted {
            Some(blot) => {
                if blot.shape() != frame.shape() {
                    return Err(DashError::ShapeMismatch {
                        expected: frame.shape(),
                        actual: blot.shape(),
                    });
                }
                dq::clear_where(&mut frame.dq, dq::CR, |y, x, v| {
                    v & dq::CR != 0 && blot.is_source(y, x)
                });
            }
            // The blotted mask comes from a resampling stage that may not
            // have run; without it there is nothing to reset.
            None => debug!(frame = %frame.name(), "no blotted mask; source flag reset skipped"),
        }
    }

    Ok(report)
}

fn narrow<F>(cand: &mut Array2<bool>, keep: F)
where
    F: Fn(usize, usize) -> bool,
{
    for ((y, x), v) in cand.indexed_iter_mut() {
        if *v && !keep(y, x) {
            *v = false;
        }
    }
}

fn empty_mask_error(frame: &DiffFrame, step: &str) -> DashError {
    DashError::DataQuality {
        root: frame.root.clone(),
        index: frame.index,
        reason: format!("no usable sky pixels at {step}"),
    }
}
