//! The difference frame: one reconstructed flux-rate image per adjacent
//! read pair.

use ndarray::{s, Array2};

use crate::consts::TRIM_BORDER;

/// A calibrated difference frame, identified by `(root, index)`.
///
/// Science values are flux rate (signal over elapsed time). All planes share
/// the trimmed shape: native size minus [`TRIM_BORDER`] on every side.
#[derive(Clone, Debug)]
pub struct DiffFrame {
    pub root: String,
    /// Pair index `j` within the parent exposure (`1..=nsamp-2`).
    pub index: usize,
    /// Flux rate, electrons per second.
    pub sci: Array2<f32>,
    /// Propagated per-pixel uncertainty, same units as `sci`.
    pub err: Array2<f32>,
    /// Data-quality bitmask. The only mutable plane after extraction.
    pub dq: Array2<u16>,
    /// Sample-count plane, constant 1.
    pub samp: Array2<i16>,
    /// Integration-time plane, constant `dt`.
    pub integ: Array2<f32>,
    /// Elapsed time covered by this pair, seconds.
    pub dt: f32,
    /// Sky level recorded by background estimation (provenance; set even when
    /// subtraction is disabled).
    pub sky: Option<f32>,
    /// One-shot marker guarding against double background subtraction.
    pub bg_subtracted: bool,
}

impl DiffFrame {
    /// Artifact name shared by every plane of this frame.
    pub fn name(&self) -> String {
        frame_name(&self.root, self.index)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.sci.dim()
    }
}

/// Canonical `{root}_{index:02}` artifact naming.
pub fn frame_name(root: &str, index: usize) -> String {
    format!("{root}_{index:02}")
}

/// Strip [`TRIM_BORDER`] pixels from every side of a native-resolution plane.
pub fn trim_plane<T: Clone>(plane: &Array2<T>) -> Array2<T> {
    let (h, w) = plane.dim();
    let b = TRIM_BORDER;
    plane.slice(s![b..h - b, b..w - b]).to_owned()
}

/// Trimmed shape corresponding to a native shape.
pub fn trimmed_shape(native: (usize, usize)) -> (usize, usize) {
    (native.0 - 2 * TRIM_BORDER, native.1 - 2 * TRIM_BORDER)
}
