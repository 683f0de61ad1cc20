//! Input model: a multi-read exposure as stored on disk.

use ndarray::Array2;

use crate::error::{DashError, Result};

/// One physical read as stored in the multi-read product: a mean counts-rate
/// plane, its DQ plane, and the cumulative sample time at which the read was
/// taken.
#[derive(Clone, Debug)]
pub struct ReadSample {
    /// Mean signal rate over the interval `[0, sample_time]`, native size.
    pub counts_rate: Array2<f32>,
    /// Raw per-read data-quality bitmask, native size.
    pub dq: Array2<u16>,
    /// Cumulative integration time of this read, in seconds.
    pub sample_time: f32,
}

/// Exposure-level metadata carried by the primary header.
#[derive(Clone, Debug)]
pub struct ExposureMeta {
    /// Base identifier shared by every artifact derived from this exposure.
    pub root: String,
    pub instrument: String,
    pub detector: String,
    /// Brightness unit of the per-read science planes.
    pub bunit: String,
    /// Number of physical reads, including the zeroth read.
    pub nsamp: usize,
    /// Calibration steps already completed on this file.
    pub completed_steps: Vec<String>,
    /// Per-amplifier read noise, electrons, in quadrant order A, B, C, D.
    pub readnoise: [f32; 4],
}

/// A validated multi-read exposure.
///
/// `reads` are kept in physical storage order, which is latest-read-first;
/// [`crate::cube::ReadCube`] reverses them into time order.
#[derive(Clone, Debug)]
pub struct Exposure {
    pub meta: ExposureMeta,
    pub reads: Vec<ReadSample>,
}

impl Exposure {
    /// Admission tests for the reduction pipeline. Every failure is fatal and
    /// reported as [`DashError::Validation`]; nothing is retried.
    pub fn validate(&self) -> Result<()> {
        let m = &self.meta;
        if m.instrument.trim() != "WFC3" || m.detector.trim() != "IR" {
            return Err(DashError::Validation(format!(
                "not a WFC3/IR observation: instrument={}, detector={}",
                m.instrument, m.detector
            )));
        }
        if self.reads.len() < 2 {
            return Err(DashError::Validation(
                "only one science read; not a multi-read product".into(),
            ));
        }
        if m.completed_steps.is_empty() {
            return Err(DashError::Validation(
                "no calibration steps completed; this looks like a raw file".into(),
            ));
        }
        if m.bunit.trim() != "ELECTRONS/S" {
            return Err(DashError::Validation(format!(
                "science planes are in \"{}\", expected \"ELECTRONS/S\"; \
                 rerun calibration with unit and flat-field corrections enabled",
                m.bunit
            )));
        }
        if m.nsamp != self.reads.len() {
            return Err(DashError::Validation(format!(
                "NSAMP={} but {} reads supplied",
                m.nsamp,
                self.reads.len()
            )));
        }
        let shape = self.reads[0].counts_rate.dim();
        for (i, read) in self.reads.iter().enumerate() {
            if read.counts_rate.dim() != shape || read.dq.dim() != shape {
                return Err(DashError::Validation(format!(
                    "read {i} has inconsistent plane shape"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn read(shape: (usize, usize), t: f32) -> ReadSample {
        ReadSample {
            counts_rate: Array2::zeros(shape),
            dq: Array2::zeros(shape),
            sample_time: t,
        }
    }

    fn exposure() -> Exposure {
        Exposure {
            meta: ExposureMeta {
                root: "iabc01x0q".into(),
                instrument: "WFC3".into(),
                detector: "IR".into(),
                bunit: "ELECTRONS/S".into(),
                nsamp: 3,
                completed_steps: vec!["UNITCORR".into(), "FLATCORR".into()],
                readnoise: [20.0; 4],
            },
            reads: vec![read((8, 8), 20.0), read((8, 8), 10.0), read((8, 8), 0.0)],
        }
    }

    #[test]
    fn valid_exposure_passes() {
        assert!(exposure().validate().is_ok());
    }

    #[test]
    fn wrong_detector_rejected() {
        let mut e = exposure();
        e.meta.detector = "UVIS".into();
        assert!(matches!(e.validate(), Err(DashError::Validation(_))));
    }

    #[test]
    fn raw_file_rejected() {
        let mut e = exposure();
        e.meta.completed_steps.clear();
        assert!(matches!(e.validate(), Err(DashError::Validation(_))));
    }

    #[test]
    fn wrong_units_rejected() {
        let mut e = exposure();
        e.meta.bunit = "COUNTS".into();
        assert!(matches!(e.validate(), Err(DashError::Validation(_))));
    }

    #[test]
    fn nsamp_mismatch_rejected() {
        let mut e = exposure();
        e.meta.nsamp = 5;
        assert!(matches!(e.validate(), Err(DashError::Validation(_))));
    }
}
