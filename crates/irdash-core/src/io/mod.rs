//! File-based collaborators: FITS loading for exposures and reference
//! files, and the directory-backed frame store.

mod fits_util;
pub mod flat;
pub mod ima;
pub mod store;

pub use store::FitsStore;
