//! Error types for NetReach

use thiserror::Error;

/// Main error type for NetReach operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data store error: {0}")]
    DataStore(#[from] rusqlite::Error),

    #[error("layer format error: {0}")]
    LayerFormat(String),

    #[error("wrong geometry type: expected {expected}, got {actual}")]
    WrongGeometryType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("layer '{0}' contains no usable features")]
    EmptyLayer(String),

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("operation canceled")]
    Canceled,

    #[error("algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::LayerFormat(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::LayerFormat(e.to_string())
    }
}

/// Result type alias for NetReach operations
pub type Result<T> = std::result::Result<T, Error>;
