//! The "currently open message" state of a viewer.
//!
//! At most one message is current. Loading a new file replaces it, a failed
//! load clears it, and nothing is cached across loads.

use std::path::Path;

use crate::error::{MsgViewError, Result};
use crate::model::mail::{MailRecord, ParsedMessage};
use crate::parser;

/// Viewer state: the current message and the last load error.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<ParsedMessage>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `data` and make it the current message.
    ///
    /// On failure the session is reset to "nothing loaded" and the error's
    /// message is kept for display.
    pub fn load(&mut self, data: &[u8], file_name: &str) -> Result<&ParsedMessage> {
        self.clear();
        if !parser::is_supported_file(file_name) {
            return Err(self.fail(unsupported(file_name)));
        }

        match parser::parse(data, file_name) {
            Ok(record) => Ok(self.replace(file_name, record)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Read and parse a file from disk, refusing anything above `max_size` bytes.
    pub fn open(&mut self, path: impl AsRef<Path>, max_size: u64) -> Result<&ParsedMessage> {
        self.clear();
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if !parser::is_supported_file(&file_name) {
            return Err(self.fail(unsupported(&path.display().to_string())));
        }

        match parser::parse_file(path, max_size) {
            Ok(record) => Ok(self.replace(&file_name, record)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drop the current message and any error.
    pub fn clear(&mut self) {
        self.current = None;
        self.last_error = None;
    }

    pub fn current(&self) -> Option<&ParsedMessage> {
        self.current.as_ref()
    }

    pub fn record(&self) -> Option<&MailRecord> {
        self.current.as_ref().map(|m| &m.record)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the current message has any plain-text content.
    pub fn has_content(&self) -> bool {
        self.record().is_some_and(MailRecord::has_content)
    }

    fn replace(&mut self, file_name: &str, record: MailRecord) -> &ParsedMessage {
        tracing::info!(file = file_name, subject = %record.subject, "Loaded message");
        self.current.insert(ParsedMessage {
            file_name: file_name.to_string(),
            record,
        })
    }

    fn fail(&mut self, e: MsgViewError) -> MsgViewError {
        tracing::warn!(error = %e, "Failed to load message");
        self.last_error = Some(e.to_string());
        e
    }
}

fn unsupported(name: &str) -> MsgViewError {
    MsgViewError::InvalidPath(format!("{name}: only .msg and .eml files are supported"))
}
