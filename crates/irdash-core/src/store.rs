//! Frame persistence: the arena the pipeline checkpoints into.
//!
//! Components mutate in-memory [`DiffFrame`]s and persist at defined
//! checkpoints (after extraction, after reconciliation) rather than after
//! every touch, so the pipeline stays testable without filesystem coupling.
//! [`MemoryStore`] is the in-memory arena; the directory-backed FITS store
//! lives in [`crate::io`].

use std::collections::HashMap;

use crate::asn::AsnRecord;
use crate::error::{DashError, Result};
use crate::frame::DiffFrame;

pub trait FrameStore {
    /// Persist a frame for the first time.
    fn save(&mut self, frame: &DiffFrame) -> Result<()>;

    /// Re-persist an already-saved frame (read-modify-write checkpoint).
    fn update(&mut self, frame: &DiffFrame) -> Result<()>;

    fn load(&self, root: &str, index: usize) -> Result<DiffFrame>;

    /// Ascending pair indices stored for a root.
    fn list(&self, root: &str) -> Vec<usize>;

    fn save_asn(&mut self, asn: &AsnRecord) -> Result<()>;

    fn load_asn(&self, root: &str) -> Result<AsnRecord>;
}

/// In-memory frame arena keyed by `(root, index)`.
#[derive(Default)]
pub struct MemoryStore {
    frames: HashMap<(String, usize), DiffFrame>,
    asn: HashMap<String, AsnRecord>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameStore for MemoryStore {
    fn save(&mut self, frame: &DiffFrame) -> Result<()> {
        self.frames
            .insert((frame.root.clone(), frame.index), frame.clone());
        Ok(())
    }

    fn update(&mut self, frame: &DiffFrame) -> Result<()> {
        let key = (frame.root.clone(), frame.index);
        if !self.frames.contains_key(&key) {
            return Err(DashError::FrameIndexOutOfRange {
                index: frame.index,
                total: self.list(&frame.root).len(),
            });
        }
        self.frames.insert(key, frame.clone());
        Ok(())
    }

    fn load(&self, root: &str, index: usize) -> Result<DiffFrame> {
        self.frames
            .get(&(root.to_owned(), index))
            .cloned()
            .ok_or_else(|| DashError::FrameIndexOutOfRange {
                index,
                total: self.list(root).len(),
            })
    }

    fn list(&self, root: &str) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .frames
            .keys()
            .filter(|(r, _)| r == root)
            .map(|(_, j)| *j)
            .collect();
        indices.sort_unstable();
        indices
    }

    fn save_asn(&mut self, asn: &AsnRecord) -> Result<()> {
        self.asn.insert(asn.root.clone(), asn.clone());
        Ok(())
    }

    fn load_asn(&self, root: &str) -> Result<AsnRecord> {
        self.asn
            .get(root)
            .cloned()
            .ok_or_else(|| DashError::MissingArtifact(format!("no association stored for {root}")))
    }
}
