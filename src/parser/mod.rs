//! Email parsing: format dispatch, the two source adapters, and the helpers they share.

pub mod attachment;
pub mod eml;
pub mod header;
pub mod identity;
pub mod msg;
pub mod outlook;

use std::path::Path;

use crate::error::{MsgViewError, Result};
use crate::model::mail::MailRecord;

/// The two supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Outlook compound-binary message (`.msg`).
    Msg,
    /// Internet-mail text document (`.eml`).
    Eml,
}

impl SourceFormat {
    /// Route by file name: `.eml` (any case) is internet mail, anything else is
    /// treated as an Outlook container.
    pub fn from_file_name(file_name: &str) -> Self {
        if has_suffix(file_name, ".eml") {
            Self::Eml
        } else {
            Self::Msg
        }
    }

    /// Decode `data` with this format's adapter.
    pub fn parse(self, data: &[u8]) -> Result<MailRecord> {
        match self {
            Self::Msg => msg::parse_msg(data),
            Self::Eml => eml::parse_eml(data),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Msg => "Outlook MSG",
            Self::Eml => "EML",
        })
    }
}

/// Pick the adapter for `file_name`.
pub fn detect_format(file_name: &str) -> SourceFormat {
    SourceFormat::from_file_name(file_name)
}

/// Whether `file_name` carries one of the extensions a viewer should accept.
pub fn is_supported_file(file_name: &str) -> bool {
    has_suffix(file_name, ".msg") || has_suffix(file_name, ".eml")
}

/// Parse an in-memory file into a [`MailRecord`], routing by file name.
///
/// Only a whole-document decode failure is returned as an error; missing
/// fields and unreadable attachments degrade into the record's placeholders.
pub fn parse(data: &[u8], file_name: &str) -> Result<MailRecord> {
    let format = detect_format(file_name);
    tracing::debug!(file = file_name, %format, bytes = data.len(), "Parsing");
    format.parse(data)
}

/// Read a file from disk (refusing anything above `max_size` bytes) and parse it.
pub fn parse_file(path: impl AsRef<Path>, max_size: u64) -> Result<MailRecord> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| read_error(path, e))?;
    if metadata.len() > max_size {
        return Err(MsgViewError::FileTooLarge {
            size: metadata.len(),
            limit: max_size,
        });
    }

    let data = std::fs::read(path).map_err(|e| read_error(path, e))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MsgViewError::InvalidPath(path.display().to_string()))?;

    let record = parse(&data, file_name)?;
    tracing::info!(file = %path.display(), attachments = record.attachments.len(), "Parsed file");
    Ok(record)
}

fn read_error(path: &Path, e: std::io::Error) -> MsgViewError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MsgViewError::FileNotFound(path.to_path_buf())
    } else {
        MsgViewError::io(path, e)
    }
}

fn has_suffix(file_name: &str, suffix: &str) -> bool {
    file_name.to_lowercase().ends_with(suffix)
}
