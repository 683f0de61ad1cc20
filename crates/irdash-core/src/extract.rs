//! Difference-frame extraction: turns a [`ReadCube`] into calibrated
//! per-pair frames.

use ndarray::{Array2, Zip};
use rayon::prelude::*;
use tracing::info;

use crate::consts::{PARALLEL_FRAME_THRESHOLD, TRIM_BORDER};
use crate::cube::ReadCube;
use crate::dq;
use crate::error::{DashError, Result};
use crate::frame::{trim_plane, DiffFrame};

/// Extract one calibrated difference frame per adjacent read pair.
///
/// Produces exactly `nsamp - 2` frames in ascending pair order. The flat
/// field scales the Poisson term of the variance into instrumental counts;
/// it must match the cube's native shape.
///
/// Frames are independent of one another, so extraction fans out over Rayon
/// when there are enough pairs to be worth it. Persistence is the caller's
/// concern.
pub fn extract(cube: &ReadCube, flat: &Array2<f32>, root: &str) -> Result<Vec<DiffFrame>> {
    if cube.pair_count() == 0 {
        return Err(DashError::EmptySequence);
    }
    if flat.dim() != cube.native_shape() {
        return Err(DashError::ShapeMismatch {
            expected: cube.native_shape(),
            actual: flat.dim(),
        });
    }
    let (h, w) = cube.native_shape();
    if h <= 2 * TRIM_BORDER || w <= 2 * TRIM_BORDER {
        return Err(DashError::ShapeMismatch {
            expected: (2 * TRIM_BORDER + 1, 2 * TRIM_BORDER + 1),
            actual: (h, w),
        });
    }

    let indices: Vec<usize> = (1..=cube.pair_count()).collect();
    let frames: Vec<DiffFrame> = if indices.len() >= PARALLEL_FRAME_THRESHOLD {
        indices
            .par_iter()
            .map(|&j| build_frame(cube, flat, root, j))
            .collect::<Result<_>>()?
    } else {
        indices
            .iter()
            .map(|&j| build_frame(cube, flat, root, j))
            .collect::<Result<_>>()?
    };

    info!(root, frames = frames.len(), "difference frames extracted");
    Ok(frames)
}

fn build_frame(cube: &ReadCube, flat: &Array2<f32>, root: &str, j: usize) -> Result<DiffFrame> {
    let dt = cube.dt(j)?;
    let raw = cube.raw_diff(j)?;

    let sci_rate = raw.mapv(|v| v / dt);

    // Two reads bound the interval, each contributing read noise once; the
    // Poisson term is scaled to counts through the flat before converting
    // back to a rate-equivalent error.
    let err = Zip::from(&sci_rate)
        .and(cube.readnoise_var())
        .and(flat)
        .map_collect(|&s, &rn, &f| {
            let var = 2.0 * rn + s * f * dt;
            var.max(0.0).sqrt() / dt
        });

    let mut dq_plane = cube.later_dq(j)?.clone();
    dq::normalize_plane(&mut dq_plane);

    let sci = trim_plane(&sci_rate);
    let trimmed = sci.dim();

    Ok(DiffFrame {
        root: root.to_owned(),
        index: j,
        err: trim_plane(&err),
        dq: trim_plane(&dq_plane),
        samp: Array2::from_elem(trimmed, 1i16),
        integ: Array2::from_elem(trimmed, dt),
        sci,
        dt,
        sky: None,
        bg_subtracted: false,
    })
}
