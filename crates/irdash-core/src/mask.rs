//! Source-footprint masks and the interface to the external detection stage.
//!
//! Actual source detection (thresholding, convolution, segmentation) belongs
//! to an external photometry collaborator. The pipeline only consumes its
//! output: a per-pixel label map where 0 means sky.

use std::collections::BTreeMap;
use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// A segmentation map: integer source labels, 0 = sky. Consumed read-only.
#[derive(Clone, Debug)]
pub struct SourceMask {
    labels: Array2<i32>,
}

impl SourceMask {
    pub fn new(labels: Array2<i32>) -> SourceMask {
        SourceMask { labels }
    }

    /// All-sky mask of the given shape.
    pub fn empty(shape: (usize, usize)) -> SourceMask {
        SourceMask {
            labels: Array2::zeros(shape),
        }
    }

    /// Build from a boolean footprint; true pixels get label 1.
    pub fn from_bool(footprint: &Array2<bool>) -> SourceMask {
        SourceMask {
            labels: footprint.mapv(|v| i32::from(v)),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.labels.dim()
    }

    pub fn is_source(&self, y: usize, x: usize) -> bool {
        self.labels[[y, x]] > 0
    }

    pub fn label(&self, y: usize, x: usize) -> i32 {
        self.labels[[y, x]]
    }

    pub fn labels(&self) -> &Array2<i32> {
        &self.labels
    }
}

/// Supplier of segmentation maps, injected by the caller so the detection
/// stage can be swapped for an in-memory double in tests.
pub trait SourceMaskProvider {
    /// One mask per root, derived from the exposure's deepest read. Drives
    /// background candidate masking and cosmic-ray reconciliation.
    fn exposure_mask(&self, root: &str, deepest: &Array2<f32>) -> Result<SourceMask>;

    /// Per-difference-frame mask; feeds the alignment stage's source lists.
    fn frame_mask(&self, root: &str, index: usize, sci: &Array2<f32>) -> Result<SourceMask>;
}

/// In-memory provider holding precomputed maps, keyed the same way the
/// file-based collaborator keys its outputs. Frames without an entry get an
/// all-sky mask of the requested shape.
#[derive(Default)]
pub struct StaticMaskProvider {
    exposure: HashMap<String, SourceMask>,
    frames: HashMap<(String, usize), SourceMask>,
}

impl StaticMaskProvider {
    pub fn new() -> StaticMaskProvider {
        StaticMaskProvider::default()
    }

    pub fn with_exposure_mask(mut self, root: &str, mask: SourceMask) -> StaticMaskProvider {
        self.exposure.insert(root.to_owned(), mask);
        self
    }

    pub fn with_frame_mask(mut self, root: &str, index: usize, mask: SourceMask) -> StaticMaskProvider {
        self.frames.insert((root.to_owned(), index), mask);
        self
    }
}

impl SourceMaskProvider for StaticMaskProvider {
    fn exposure_mask(&self, root: &str, deepest: &Array2<f32>) -> Result<SourceMask> {
        Ok(self
            .exposure
            .get(root)
            .cloned()
            .unwrap_or_else(|| SourceMask::empty(deepest.dim())))
    }

    fn frame_mask(&self, root: &str, index: usize, sci: &Array2<f32>) -> Result<SourceMask> {
        Ok(self
            .frames
            .get(&(root.to_owned(), index))
            .cloned()
            .unwrap_or_else(|| SourceMask::empty(sci.dim())))
    }
}

/// One detected source summarized from a segmentation map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub label: i32,
    pub ycentroid: f64,
    pub xcentroid: f64,
    /// Pixel count of the footprint.
    pub area: usize,
    /// Summed science-plane flux over the footprint.
    pub flux: f64,
}

/// Catalog of sources for one image, ordered by label. This is the source
/// list the external aligner matches against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceList {
    pub name: String,
    pub sources: Vec<SourceEntry>,
}

impl SourceList {
    /// Flux-weighted centroids, areas, and total flux per label.
    pub fn from_mask(name: &str, mask: &SourceMask, sci: &Array2<f32>) -> Result<SourceList> {
        if mask.shape() != sci.dim() {
            return Err(DashError::ShapeMismatch {
                expected: sci.dim(),
                actual: mask.shape(),
            });
        }
        // (area, flux, sum y*w, sum x*w, sum w) per label
        let mut acc: BTreeMap<i32, (usize, f64, f64, f64, f64)> = BTreeMap::new();
        for ((y, x), &label) in mask.labels().indexed_iter() {
            if label <= 0 {
                continue;
            }
            let v = f64::from(sci[[y, x]]);
            let w = v.max(0.0);
            let e = acc.entry(label).or_insert((0, 0.0, 0.0, 0.0, 0.0));
            e.0 += 1;
            e.1 += v;
            e.2 += y as f64 * w;
            e.3 += x as f64 * w;
            e.4 += w;
        }
        let sources = acc
            .into_iter()
            .map(|(label, (area, flux, sy, sx, sw))| {
                // Fall back to the unweighted footprint center when a source
                // has no positive flux.
                let (yc, xc) = if sw > 0.0 {
                    (sy / sw, sx / sw)
                } else {
                    centroid_unweighted(mask, label)
                };
                SourceEntry {
                    label,
                    ycentroid: yc,
                    xcentroid: xc,
                    area,
                    flux,
                }
            })
            .collect();
        Ok(SourceList {
            name: name.to_owned(),
            sources,
        })
    }
}

fn centroid_unweighted(mask: &SourceMask, label: i32) -> (f64, f64) {
    let mut n = 0usize;
    let (mut sy, mut sx) = (0.0f64, 0.0f64);
    for ((y, x), &l) in mask.labels().indexed_iter() {
        if l == label {
            n += 1;
            sy += y as f64;
            sx += x as f64;
        }
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (sy / n as f64, sx / n as f64)
    }
}
