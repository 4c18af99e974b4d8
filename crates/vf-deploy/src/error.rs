//! Error types for vf-deploy.
//!
//! Error messages name the offending field or key but never include
//! credential values.

use std::fmt;

/// Result type alias for vf-deploy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for vf-deploy operations.
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

    /// Returns true if the error was raised before the external tool ran.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MissingPackage
                | ErrorKind::MissingCredential(_)
                | ErrorKind::Metadata(_)
                | ErrorKind::InvalidState { .. }
                | ErrorKind::InvalidMode(_)
                | ErrorKind::Config(_)
        )
    }

    /// Captured tool output, if the tool ran and failed.
    pub fn tool_output(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::ToolFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// A credential field that was missing after assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialField::Username => write!(f, "username"),
            CredentialField::Password => write!(f, "password"),
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The operation needs a package manifest and none was given.
    #[error("pkg attribute is not defined")]
    MissingPackage,

    /// Username or password empty after assembly.
    #[error("Missing credential: {0} is not defined")]
    MissingCredential(CredentialField),

    /// Metadata resolution or descriptor error.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Archive error.
    #[error("Archive error: {0}")]
    Archive(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The deployment tool could not be started.
    #[error("Failed to start {0}")]
    Spawn(String),

    /// The deployment tool exited unsuccessfully.
    #[error("Deployment tool failed with exit code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ToolFailed { code: Option<i32>, output: String },

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// A session method was called in the wrong state.
    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The operation mode does not support the requested step.
    #[error("Operation not supported in {0} mode")]
    InvalidMode(String),
}

impl From<forcepack_vf_metadata::Error> for Error {
    fn from(err: forcepack_vf_metadata::Error) -> Self {
        Error::with_source(ErrorKind::Metadata(err.to_string()), err)
    }
}

impl From<forcepack_vf_archive::Error> for Error {
    fn from(err: forcepack_vf_archive::Error) -> Self {
        Error::with_source(ErrorKind::Archive(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let message = err.to_string();
        Error::with_source(ErrorKind::Io(message), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::MissingCredential(CredentialField::Username).to_string(),
            "Missing credential: username is not defined"
        );
        assert_eq!(
            ErrorKind::ToolFailed {
                code: Some(1),
                output: "BUILD FAILED".to_string()
            }
            .to_string(),
            "Deployment tool failed with exit code 1"
        );
        assert_eq!(
            ErrorKind::ToolFailed {
                code: None,
                output: String::new()
            }
            .to_string(),
            "Deployment tool failed with exit code unknown"
        );
    }

    #[test]
    fn test_preflight_classification() {
        assert!(Error::new(ErrorKind::MissingPackage).is_preflight());
        assert!(!Error::new(ErrorKind::Cancelled).is_preflight());

        let failed = Error::new(ErrorKind::ToolFailed {
            code: Some(1),
            output: "BUILD FAILED".to_string(),
        });
        assert!(!failed.is_preflight());
        assert_eq!(failed.tool_output(), Some("BUILD FAILED"));
    }
}
