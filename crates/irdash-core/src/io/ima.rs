//! Loading a multi-read exposure from its multi-extension FITS layout.
//!
//! The file carries a primary header followed by one SCI/ERR/DQ/SAMP/TIME
//! extension group per read, latest read first. Only the planes the
//! reduction consumes are materialized.

use std::path::Path;

use fitrs::Fits;
use tracing::info;

use crate::error::{DashError, Result};
use crate::exposure::{Exposure, ExposureMeta, ReadSample};

use super::fits_util::{header_f64, header_int, header_str, read_image_f32, read_image_u16};

/// Extensions per read group: SCI, ERR, DQ, SAMP, TIME.
const EXTS_PER_READ: usize = 5;

/// Calibration switches checked to distinguish a calibrated product from a
/// raw file.
const CALIB_KEYS: [&str; 12] = [
    "DQICORR", "ZSIGCORR", "ZOFFCORR", "DARKCORR", "BLEVCORR", "NLINCORR", "FLATCORR", "CRCORR",
    "UNITCORR", "PHOTCORR", "RPTCORR", "DRIZCORR",
];

pub fn load_exposure(path: &Path) -> Result<Exposure> {
    let fits = Fits::open(path)?;
    let primary = fits
        .get(0)
        .ok_or_else(|| DashError::InvalidFits(format!("{}: no primary HDU", path.display())))?;

    let instrument = header_str(&primary, "INSTRUME")?;
    let detector = header_str(&primary, "DETECTOR")?;
    let nsamp = header_int(&primary, "NSAMP")? as usize;
    let readnoise = [
        header_f64(&primary, "READNSEA")? as f32,
        header_f64(&primary, "READNSEB")? as f32,
        header_f64(&primary, "READNSEC")? as f32,
        header_f64(&primary, "READNSED")? as f32,
    ];
    let completed_steps: Vec<String> = CALIB_KEYS
        .iter()
        .filter(|key| {
            matches!(header_str(&primary, key), Ok(v) if v == "COMPLETE")
        })
        .map(|key| (*key).to_owned())
        .collect();

    let root = root_from_path(path);

    let mut reads = Vec::with_capacity(nsamp);
    let mut bunit = String::new();
    for k in 0..nsamp {
        let base = 1 + k * EXTS_PER_READ;
        let sci_hdu = fits.get(base).ok_or_else(|| {
            DashError::InvalidFits(format!("missing SCI extension for read {k}"))
        })?;
        if k == 0 {
            bunit = header_str(&sci_hdu, "BUNIT")?;
        }
        let dq_hdu = fits.get(base + 2).ok_or_else(|| {
            DashError::InvalidFits(format!("missing DQ extension for read {k}"))
        })?;
        let time_hdu = fits.get(base + 4).ok_or_else(|| {
            DashError::InvalidFits(format!("missing TIME extension for read {k}"))
        })?;

        reads.push(ReadSample {
            counts_rate: read_image_f32(&sci_hdu)?,
            dq: read_image_u16(&dq_hdu)?,
            sample_time: header_f64(&time_hdu, "PIXVALUE")? as f32,
        });
    }

    info!(root = %root, nsamp, "exposure loaded");

    Ok(Exposure {
        meta: ExposureMeta {
            root,
            instrument,
            detector,
            bunit,
            nsamp,
            completed_steps,
            readnoise,
        },
        reads,
    })
}

/// Root identifier from the file name: everything before the `_ima` suffix.
pub fn root_from_path(path: &Path) -> String {
    let stem = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix(".fits").unwrap_or(&stem);
    stem.strip_suffix("_ima").unwrap_or(stem).to_owned()
}
