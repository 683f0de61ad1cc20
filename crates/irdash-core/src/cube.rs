//! Time-ordered read stack and per-pair differences.

use ndarray::{s, Array1, Array2};
use tracing::debug;

use crate::error::{DashError, Result};
use crate::exposure::Exposure;

/// An exposure's reads reconstructed into accumulated-signal frames, sorted
/// into ascending time order, with successive differences precomputed.
///
/// Storage order in the multi-read product is latest-read-first, so the
/// reversal performed here is load-bearing: without it every "difference"
/// would run backwards in time. The difference between the zeroth and first
/// real read is discarded (that gap is not used for science), leaving pair
/// indices `1..=nsamp-2`.
///
/// Immutable once built.
#[derive(Clone, Debug)]
pub struct ReadCube {
    nsamp: usize,
    native_shape: (usize, usize),
    /// Accumulated signal per read (electrons), index 0 = earliest read.
    signal: Vec<Array2<f32>>,
    /// Raw DQ per read, same ordering as `signal`.
    dq: Vec<Array2<u16>>,
    /// Cumulative time per read, seconds.
    time: Array1<f32>,
    /// Signal differences between adjacent reads; `diff[k] = signal[k+1] - signal[k]`.
    diff: Vec<Array2<f32>>,
    /// Elapsed time per adjacent pair, same indexing as `diff`.
    dt: Array1<f32>,
    /// Per-quadrant read-noise map, squared into a variance term at build time.
    readnoise_var: Array2<f32>,
}

impl ReadCube {
    /// Build the cube from a validated exposure.
    pub fn from_exposure(exposure: &Exposure) -> Result<ReadCube> {
        let nsamp = exposure.reads.len();
        if nsamp < 2 {
            return Err(DashError::EmptySequence);
        }
        let native_shape = exposure.reads[0].counts_rate.dim();

        // Reverse latest-first storage order into ascending time order while
        // rescaling the stored mean rate into accumulated signal.
        let mut signal = vec![Array2::<f32>::zeros(native_shape); nsamp];
        let mut dq = vec![Array2::<u16>::zeros(native_shape); nsamp];
        let mut time = Array1::<f32>::zeros(nsamp);
        for (i, read) in exposure.reads.iter().enumerate() {
            if read.counts_rate.dim() != native_shape {
                return Err(DashError::ShapeMismatch {
                    expected: native_shape,
                    actual: read.counts_rate.dim(),
                });
            }
            let slot = nsamp - 1 - i;
            signal[slot] = read.counts_rate.mapv(|v| v * read.sample_time);
            dq[slot] = read.dq.clone();
            time[slot] = read.sample_time;
        }

        let diff: Vec<Array2<f32>> = (0..nsamp - 1)
            .map(|k| &signal[k + 1] - &signal[k])
            .collect();
        let dt = Array1::from_iter((0..nsamp - 1).map(|k| time[k + 1] - time[k]));

        let readnoise_var = quadrant_variance(native_shape, exposure.meta.readnoise);

        debug!(
            nsamp,
            pairs = nsamp.saturating_sub(2),
            "read cube assembled"
        );

        Ok(ReadCube {
            nsamp,
            native_shape,
            signal,
            dq,
            time,
            diff,
            dt,
            readnoise_var,
        })
    }

    pub fn nsamp(&self) -> usize {
        self.nsamp
    }

    pub fn native_shape(&self) -> (usize, usize) {
        self.native_shape
    }

    /// Number of science pairs: the zeroth-read gap is excluded.
    pub fn pair_count(&self) -> usize {
        self.nsamp.saturating_sub(2)
    }

    /// Signal accumulated between the reads bounding pair `j` (`1..=nsamp-2`).
    pub fn raw_diff(&self, j: usize) -> Result<&Array2<f32>> {
        self.check_pair(j)?;
        Ok(&self.diff[j])
    }

    /// Elapsed time of pair `j`.
    pub fn dt(&self, j: usize) -> Result<f32> {
        self.check_pair(j)?;
        Ok(self.dt[j])
    }

    /// Raw DQ plane of the later read bounding pair `j`.
    pub fn later_dq(&self, j: usize) -> Result<&Array2<u16>> {
        self.check_pair(j)?;
        Ok(&self.dq[j + 1])
    }

    /// Cumulative time of read `k` (post-reversal indexing).
    pub fn time(&self, k: usize) -> f32 {
        self.time[k]
    }

    /// The final, longest-exposed accumulated frame. Source detection and
    /// cosmic-ray identification both run against this read.
    pub fn deepest_read(&self) -> &Array2<f32> {
        &self.signal[self.nsamp - 1]
    }

    /// Squared per-quadrant read-noise map (a variance contribution).
    pub fn readnoise_var(&self) -> &Array2<f32> {
        &self.readnoise_var
    }

    fn check_pair(&self, j: usize) -> Result<()> {
        if j == 0 || j > self.nsamp.saturating_sub(2) {
            return Err(DashError::FrameIndexOutOfRange {
                index: j,
                total: self.pair_count(),
            });
        }
        Ok(())
    }
}

/// Build the per-quadrant read-noise variance map: four per-amplifier scalars
/// occupy the 2x2 quadrants of a native-resolution array, squared once here.
fn quadrant_variance(shape: (usize, usize), readnoise: [f32; 4]) -> Array2<f32> {
    let (h, w) = shape;
    let (hy, hx) = (h / 2, w / 2);
    let [a, b, c, d] = readnoise;
    let mut map = Array2::<f32>::zeros(shape);
    map.slice_mut(s![hy.., ..hx]).fill(a);
    map.slice_mut(s![..hy, ..hx]).fill(b);
    map.slice_mut(s![..hy, hx..]).fill(c);
    map.slice_mut(s![hy.., hx..]).fill(d);
    map.mapv_inplace(|v| v * v);
    map
}
