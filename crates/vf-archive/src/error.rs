//! Error types for vf-archive.

use std::path::PathBuf;

/// Result type alias for vf-archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for vf-archive operations.
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
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Archive codec error.
    #[error("Archive error: {0}")]
    Zip(String),

    /// Directory traversal error.
    #[error("Directory walk error: {0}")]
    Walk(String),

    /// Expected a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A background job did not finish normally.
    #[error("Job failed: {0}")]
    Job(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::with_source(ErrorKind::Zip(err.to_string()), err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::with_source(ErrorKind::Walk(err.to_string()), err)
    }
}

impl From<std::path::StripPrefixError> for Error {
    fn from(err: std::path::StripPrefixError) -> Self {
        Error::with_source(ErrorKind::Walk(err.to_string()), err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::with_source(ErrorKind::Job(err.to_string()), err)
    }
}
