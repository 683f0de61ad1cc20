use ndarray::Array2;

use irdash_core::exposure::{Exposure, ExposureMeta, ReadSample};
use irdash_core::frame::DiffFrame;

/// Build a synthetic exposure with a constant signal rate.
///
/// `times` are the cumulative sample times in ascending order; reads are
/// returned latest-first, matching the physical storage order the loader
/// produces.
pub fn synthetic_exposure(
    root: &str,
    shape: (usize, usize),
    times: &[f32],
    rate: f32,
    readnoise: [f32; 4],
) -> Exposure {
    let reads: Vec<ReadSample> = times
        .iter()
        .rev()
        .map(|&t| ReadSample {
            counts_rate: Array2::from_elem(shape, rate),
            dq: Array2::zeros(shape),
            sample_time: t,
        })
        .collect();
    Exposure {
        meta: ExposureMeta {
            root: root.to_owned(),
            instrument: "WFC3".into(),
            detector: "IR".into(),
            bunit: "ELECTRONS/S".into(),
            nsamp: times.len(),
            completed_steps: vec!["UNITCORR".into(), "FLATCORR".into()],
            readnoise,
        },
        reads,
    }
}

/// A difference frame with constant planes, for exercising background and
/// cosmic-ray logic in isolation.
pub fn flat_frame(root: &str, index: usize, shape: (usize, usize), value: f32) -> DiffFrame {
    DiffFrame {
        root: root.to_owned(),
        index,
        sci: Array2::from_elem(shape, value),
        err: Array2::from_elem(shape, 1.0),
        dq: Array2::zeros(shape),
        samp: Array2::from_elem(shape, 1i16),
        integ: Array2::from_elem(shape, 25.0),
        dt: 25.0,
        sky: None,
        bg_subtracted: false,
    }
}
