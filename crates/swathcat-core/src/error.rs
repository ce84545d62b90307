//! Error types shared across the swathcat catalog engine.

use thiserror::Error;

/// Result type alias using [`CatalogError`].
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type for catalog/registry/index operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    // === Lookup errors ===
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("No provider provides product '{0}'")]
    NoProvider(String),

    // === Parsing / coverage errors ===
    #[error("Filename does not match product pattern: {0}")]
    FormatError(String),

    #[error("Missing information required to determine coverage for '{0}'")]
    MissingInformation(String),

    // === Granule errors ===
    #[error("Granules are not adjacent and cannot be merged")]
    NotAdjacent,

    // === Provider / transport errors ===
    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("No remote source available for file record")]
    NoRemoteSource,

    // === Storage errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    // === Configuration errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid geometry: {0}")]
    GeometryError(String),

    #[error("Invalid time range: {0}")]
    TimeError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::StorageError(format!("JSON error: {err}"))
    }
}
