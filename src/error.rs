//! Error types for envelope encoding and decoding.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding, decoding or digesting a file.
#[derive(Error, Debug)]
pub enum Error {
    /// Source file missing or unreadable.
    #[error("File not found or unreadable: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source path has no usable file name.
    #[error("Unsupported file name: {}", .0.display())]
    UnsupportedFilename(PathBuf),

    /// Envelope text is malformed or lacks a required field.
    #[error("Invalid envelope: {0}")]
    Parse(String),

    /// Target file already exists; decoding never overwrites.
    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Digest of the written file differs from the recorded one.
    #[error(
        "Integrity check failed for {}: expected {expected}, got {actual}",
        path.display()
    )]
    Integrity {
        expected: String,
        actual: String,
        path: PathBuf,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected codec configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Background task was cancelled before completing.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::NotFound {
            path: path.into(),
            source,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Parse(format!("invalid base64 content: {}", e))
    }
}
