use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Invalid exposure: {0}")]
    Validation(String),

    #[error("Bad pixel statistics for {root}_{index:02}: {reason}")]
    DataQuality {
        root: String,
        index: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Empty read sequence")]
    EmptySequence,

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashError>;
