//! Error types for vf-metadata.

/// Result type alias for vf-metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for vf-metadata operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if a metadata key could not be resolved.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self.kind, ErrorKind::UnknownMetadataType(_))
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// No registry entry, folder alias or plural alias matched the key.
    #[error("Metadata type not found: {0}")]
    UnknownMetadataType(String),

    /// The registry document is malformed.
    #[error("Invalid metadata registry: {0}")]
    Registry(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
