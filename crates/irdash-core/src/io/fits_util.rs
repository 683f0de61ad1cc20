//! Small shims over `fitrs` header and data access.

use fitrs::{FitsData, Hdu, HeaderValue};
use ndarray::Array2;

use crate::error::{DashError, Result};

pub(crate) fn header_str(hdu: &Hdu, key: &str) -> Result<String> {
    match hdu.value(key) {
        Some(HeaderValue::CharacterString(s)) => Ok(s.trim().to_owned()),
        Some(_) => Err(DashError::InvalidFits(format!(
            "header key {key} has a non-string value"
        ))),
        None => Err(DashError::Validation(format!("missing header key {key}"))),
    }
}

pub(crate) fn header_int(hdu: &Hdu, key: &str) -> Result<i64> {
    match hdu.value(key) {
        Some(HeaderValue::IntegerNumber(v)) => Ok(i64::from(*v)),
        Some(_) => Err(DashError::InvalidFits(format!(
            "header key {key} has a non-integer value"
        ))),
        None => Err(DashError::Validation(format!("missing header key {key}"))),
    }
}

pub(crate) fn header_f64(hdu: &Hdu, key: &str) -> Result<f64> {
    match hdu.value(key) {
        Some(HeaderValue::RealFloatingNumber(v)) => Ok(*v),
        Some(HeaderValue::IntegerNumber(v)) => Ok(f64::from(*v)),
        Some(_) => Err(DashError::InvalidFits(format!(
            "header key {key} has a non-numeric value"
        ))),
        None => Err(DashError::Validation(format!("missing header key {key}"))),
    }
}

/// Image dimensions from the mandatory NAXIS keywords, `(rows, cols)`.
pub(crate) fn image_shape(hdu: &Hdu) -> Result<(usize, usize)> {
    let naxis = header_int(hdu, "NAXIS")?;
    if naxis != 2 {
        return Err(DashError::InvalidFits(format!(
            "expected a 2-D image, got NAXIS={naxis}"
        )));
    }
    let rows = header_int(hdu, "NAXIS2")?;
    let cols = header_int(hdu, "NAXIS1")?;
    if rows <= 0 || cols <= 0 {
        return Err(DashError::InvalidFits("non-positive image axis".into()));
    }
    Ok((rows as usize, cols as usize))
}

/// Flatten any stored pixel type to f64, blanks becoming 0.
pub(crate) fn data_f64(data: FitsData) -> Vec<f64> {
    match data {
        FitsData::IntegersI32(array) => array
            .data
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(0.0))
            .collect(),
        FitsData::IntegersU32(array) => array
            .data
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(0.0))
            .collect(),
        FitsData::FloatingPoint32(array) => array.data.iter().map(|&v| f64::from(v)).collect(),
        FitsData::FloatingPoint64(array) => array.data,
        FitsData::Characters(array) => array.data.iter().map(|&c| c as u8 as f64).collect(),
    }
}

pub(crate) fn read_image_f32(hdu: &Hdu) -> Result<Array2<f32>> {
    let shape = image_shape(hdu)?;
    let values: Vec<f32> = data_f64(hdu.read_data()).into_iter().map(|v| v as f32).collect();
    Array2::from_shape_vec(shape, values)
        .map_err(|_| DashError::InvalidFits("image data does not match NAXIS shape".into()))
}

pub(crate) fn read_image_u16(hdu: &Hdu) -> Result<Array2<u16>> {
    let shape = image_shape(hdu)?;
    let values: Vec<u16> = data_f64(hdu.read_data())
        .into_iter()
        .map(|v| v as i64 as u16)
        .collect();
    Array2::from_shape_vec(shape, values)
        .map_err(|_| DashError::InvalidFits("image data does not match NAXIS shape".into()))
}
