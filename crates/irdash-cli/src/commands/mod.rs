pub mod info;
pub mod reduce;
pub mod split;
