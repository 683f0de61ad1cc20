/// Border width (in pixels) stripped from every side of each native-resolution
/// plane before a difference frame is stored. Removes the reference-pixel rows
/// and columns adjacent to the detector edges.
pub const TRIM_BORDER: usize = 5;

/// Default distance from the frame edge inside which pixels are excluded from
/// sky-background statistics.
pub const DEFAULT_EDGE_MARGIN: usize = 10;

/// Default lower cutoff on the science rate for background candidate pixels.
pub const DEFAULT_RATE_FLOOR: f32 = -1.0;

/// Default multiple of the candidate median above which pixels are rejected
/// before percentile clipping.
pub const DEFAULT_MEDIAN_CAP: f32 = 5.0;

/// Default percentile window applied to the science plane during background
/// estimation.
pub const DEFAULT_SCI_CLIP: (f64, f64) = (2.5, 97.5);

/// Default percentile window applied to the error plane during background
/// estimation.
pub const DEFAULT_ERR_CLIP: (f64, f64) = (0.05, 99.5);

/// Default column bound of the detector sub-region eligible for new
/// cosmic-ray flags (columns strictly greater than this value).
pub const DEFAULT_REGION_MIN_COL: usize = 915;

/// Default row bound of the detector sub-region eligible for new cosmic-ray
/// flags (rows strictly less than this value).
pub const DEFAULT_REGION_MAX_ROW: usize = 295;

/// Default science-rate level below which an in-source pixel may still
/// receive a cosmic-ray flag.
pub const DEFAULT_FAINT_LIMIT: f32 = 1.0;

/// Minimum pair count to use frame-level Rayon parallelism during extraction.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;
