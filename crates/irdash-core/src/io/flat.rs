//! Reference-file loading: flat fields and other single-plane images.

use std::path::Path;

use fitrs::Fits;
use ndarray::Array2;

use crate::error::{DashError, Result};

use super::fits_util::read_image_f32;

/// Load a single-plane reference image from the primary HDU (or the first
/// image extension when the primary carries no data).
pub fn load_image(path: &Path) -> Result<Array2<f32>> {
    let fits = Fits::open(path)?;
    for index in 0..2 {
        if let Some(hdu) = fits.get(index) {
            if let Ok(image) = read_image_f32(&hdu) {
                return Ok(image);
            }
        }
    }
    Err(DashError::InvalidFits(format!(
        "{}: no 2-D image in the first two HDUs",
        path.display()
    )))
}

/// Load a flat-field reference image.
pub fn load_flat(path: &Path) -> Result<Array2<f32>> {
    load_image(path)
}

/// Load a segmentation map stored as an integer-valued image.
pub fn load_labels(path: &Path) -> Result<Array2<i32>> {
    let image = load_image(path)?;
    Ok(image.mapv(|v| v as i32))
}
