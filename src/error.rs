//! Centralized error types for msgview.

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::SourceFormat;

/// All errors produced by the msgview library.
#[derive(Error, Debug)]
pub enum MsgViewError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The document could not be decoded at all. No partial record exists.
    #[error("Unsupported or corrupt {format} file: {reason}")]
    CorruptContainer {
        format: SourceFormat,
        reason: String,
    },

    /// The input exceeds the configured size limit.
    #[error("File is too large ({size} bytes, limit is {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// A single attachment could not be extracted.
    ///
    /// Only ever used as the reason for a skip; never returned from `parse`.
    #[error("Attachment '{name}' could not be extracted: {reason}")]
    Attachment { name: String, reason: String },

    /// An export operation failed.
    #[error("Export error: {0}")]
    Export(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, MsgViewError>`.
pub type Result<T> = std::result::Result<T, MsgViewError>;

impl MsgViewError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `CorruptContainer` variant for the given format.
    pub fn corrupt(format: SourceFormat, reason: impl Into<String>) -> Self {
        Self::CorruptContainer {
            format,
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (prefer `MsgViewError::io`).
impl From<std::io::Error> for MsgViewError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
