//! Directory-backed frame store.
//!
//! Each frame is persisted as one FITS file per pixel plane plus a JSON
//! metadata sidecar. The pure-Rust FITS collaborator writes single-HDU
//! files, so the original multi-extension layout becomes a plane-per-file
//! family sharing the `{root}_{index:02}_diff` stem; the constant
//! sample-count and integration-time planes are written for downstream
//! consumers and rebuilt from the sidecar on load.

use std::fs;
use std::path::{Path, PathBuf};

use fitrs::{Fits, Hdu};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asn::AsnRecord;
use crate::error::{DashError, Result};
use crate::frame::{frame_name, DiffFrame};
use crate::mask::SourceList;
use crate::store::FrameStore;

use super::fits_util::data_f64;

#[derive(Serialize, Deserialize)]
struct FrameMeta {
    root: String,
    index: usize,
    dt: f32,
    sky: Option<f32>,
    bg_subtracted: bool,
    shape: (usize, usize),
}

pub struct FitsStore {
    dir: PathBuf,
}

impl FitsStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<FitsStore> {
        fs::create_dir_all(dir)?;
        Ok(FitsStore {
            dir: dir.to_owned(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn plane_path(&self, root: &str, index: usize, plane: &str) -> PathBuf {
        self.dir
            .join(format!("{}_diff_{plane}.fits", frame_name(root, index)))
    }

    fn meta_path(&self, root: &str, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}_diff_meta.json", frame_name(root, index)))
    }

    fn asn_path(&self, root: &str) -> PathBuf {
        self.dir.join(format!("{root}_asn.json"))
    }

    /// Write a per-frame source catalog for the external aligner.
    pub fn save_catalog(&self, catalog: &SourceList) -> Result<()> {
        let path = self
            .dir
            .join(format!("{}_source_list.json", catalog.name));
        fs::write(path, serde_json::to_vec_pretty(catalog)?)?;
        Ok(())
    }

    fn write_plane_f32(&self, path: &Path, plane: &Array2<f32>) -> Result<()> {
        let (h, w) = plane.dim();
        let data: Vec<f32> = plane.iter().copied().collect();
        replace_fits(path, Hdu::new(&[h, w], data))
    }

    fn write_plane_i32(&self, path: &Path, plane: &Array2<i32>) -> Result<()> {
        let (h, w) = plane.dim();
        let data: Vec<i32> = plane.iter().copied().collect();
        replace_fits(path, Hdu::new(&[h, w], data))
    }

    fn read_plane_f32(&self, path: &Path, shape: (usize, usize)) -> Result<Array2<f32>> {
        let values = self.read_plane_raw(path)?;
        Array2::from_shape_vec(shape, values.into_iter().map(|v| v as f32).collect())
            .map_err(|_| plane_shape_error(path))
    }

    fn read_plane_u16(&self, path: &Path, shape: (usize, usize)) -> Result<Array2<u16>> {
        let values = self.read_plane_raw(path)?;
        Array2::from_shape_vec(shape, values.into_iter().map(|v| v as i64 as u16).collect())
            .map_err(|_| plane_shape_error(path))
    }

    fn read_plane_raw(&self, path: &Path) -> Result<Vec<f64>> {
        let fits = Fits::open(path)?;
        let hdu = fits
            .get(0)
            .ok_or_else(|| DashError::InvalidFits(format!("{}: no primary HDU", path.display())))?;
        Ok(data_f64(hdu.read_data()))
    }
}

fn plane_shape_error(path: &Path) -> DashError {
    DashError::InvalidFits(format!(
        "{}: plane data does not match recorded shape",
        path.display()
    ))
}

/// Write a single-HDU file, replacing any stale artifact from a prior run.
fn replace_fits(path: &Path, hdu: Hdu) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Fits::create(path, hdu)?;
    Ok(())
}

impl FrameStore for FitsStore {
    fn save(&mut self, frame: &DiffFrame) -> Result<()> {
        let (root, index) = (&frame.root, frame.index);
        self.write_plane_f32(&self.plane_path(root, index, "sci"), &frame.sci)?;
        self.write_plane_f32(&self.plane_path(root, index, "err"), &frame.err)?;
        self.write_plane_i32(
            &self.plane_path(root, index, "dq"),
            &frame.dq.mapv(i32::from),
        )?;
        self.write_plane_i32(
            &self.plane_path(root, index, "samp"),
            &frame.samp.mapv(i32::from),
        )?;
        self.write_plane_f32(&self.plane_path(root, index, "time"), &frame.integ)?;

        let meta = FrameMeta {
            root: root.clone(),
            index,
            dt: frame.dt,
            sky: frame.sky,
            bg_subtracted: frame.bg_subtracted,
            shape: frame.shape(),
        };
        fs::write(
            self.meta_path(root, index),
            serde_json::to_vec_pretty(&meta)?,
        )?;
        debug!(frame = %frame.name(), dir = %self.dir.display(), "frame persisted");
        Ok(())
    }

    fn update(&mut self, frame: &DiffFrame) -> Result<()> {
        if !self.meta_path(&frame.root, frame.index).exists() {
            return Err(DashError::FrameIndexOutOfRange {
                index: frame.index,
                total: self.list(&frame.root).len(),
            });
        }
        self.save(frame)
    }

    fn load(&self, root: &str, index: usize) -> Result<DiffFrame> {
        let meta_path = self.meta_path(root, index);
        if !meta_path.exists() {
            return Err(DashError::FrameIndexOutOfRange {
                index,
                total: self.list(root).len(),
            });
        }
        let meta: FrameMeta = serde_json::from_slice(&fs::read(meta_path)?)?;
        let shape = meta.shape;

        Ok(DiffFrame {
            sci: self.read_plane_f32(&self.plane_path(root, index, "sci"), shape)?,
            err: self.read_plane_f32(&self.plane_path(root, index, "err"), shape)?,
            dq: self.read_plane_u16(&self.plane_path(root, index, "dq"), shape)?,
            samp: Array2::from_elem(shape, 1i16),
            integ: Array2::from_elem(shape, meta.dt),
            root: meta.root,
            index: meta.index,
            dt: meta.dt,
            sky: meta.sky,
            bg_subtracted: meta.bg_subtracted,
        })
    }

    fn list(&self, root: &str) -> Vec<usize> {
        let suffix = "_diff_meta.json";
        let prefix = format!("{root}_");
        let mut indices = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Some(rest) = name
                    .strip_prefix(&prefix)
                    .and_then(|r| r.strip_suffix(suffix))
                {
                    if let Ok(index) = rest.parse::<usize>() {
                        indices.push(index);
                    }
                }
            }
        }
        indices.sort_unstable();
        indices
    }

    fn save_asn(&mut self, asn: &AsnRecord) -> Result<()> {
        fs::write(self.asn_path(&asn.root), serde_json::to_vec_pretty(asn)?)?;
        Ok(())
    }

    fn load_asn(&self, root: &str) -> Result<AsnRecord> {
        let path = self.asn_path(root);
        if !path.exists() {
            return Err(DashError::MissingArtifact(format!(
                "no association stored for {root}"
            )));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}
