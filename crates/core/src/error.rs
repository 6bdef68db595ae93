//! Error types for Refuge

use thiserror::Error;

/// Main error type for Refuge operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Size mismatch: expected {expected} rows, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Missing column '{0}' in point table header")]
    MissingColumn(String),

    #[error("Malformed row at line {line}, column '{column}': {reason}")]
    MalformedRow {
        line: u64,
        column: String,
        reason: String,
    },

    #[error("Invalid feature {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Duplicate species '{0}' in range set")]
    DuplicateSpecies(String),

    #[error("Point table has no protected column; run the spatial join first")]
    NotJoined,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for Refuge operations
pub type Result<T> = std::result::Result<T, Error>;
