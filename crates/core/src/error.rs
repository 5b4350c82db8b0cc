//! Error types for EmberGis

use thiserror::Error;

/// Main error type for EmberGis operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    #[error("Classification code {code} is outside the configured scheme (0..={max_code})")]
    MaskSchemaMismatch { code: u8, max_code: u8 },

    #[error("Band '{band}' not found (available: {available:?})")]
    MissingBand {
        band: String,
        available: Vec<String>,
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for EmberGis operations
pub type Result<T> = std::result::Result<T, Error>;
