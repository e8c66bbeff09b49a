//! Per-attachment extraction with fault isolation.
//!
//! Each source attachment becomes an [`Extraction`]: either a finished
//! [`Attachment`] or a skip with its reason. A skipped attachment never
//! affects the others or the message as a whole.

use crate::error::MsgViewError;
use crate::model::attachment::{Attachment, UNNAMED};

/// Outcome of extracting one attachment.
#[derive(Debug)]
pub enum Extraction {
    Extracted(Attachment),
    Skipped(MsgViewError),
}

impl Extraction {
    /// Build an extraction from the pieces an adapter located.
    ///
    /// `content` is `Ok(None)` when the source has no bytes for this
    /// attachment and `Err` when locating or decoding them failed.
    pub fn from_parts(
        file_name: Option<&str>,
        mime_type: Option<&str>,
        content: Result<Option<Vec<u8>>, String>,
    ) -> Self {
        match content {
            Ok(Some(bytes)) => Self::Extracted(Attachment::new(file_name, mime_type, bytes)),
            Ok(None) => Self::skipped(file_name, "no content"),
            Err(reason) => Self::skipped(file_name, reason),
        }
    }

    fn skipped(file_name: Option<&str>, reason: impl Into<String>) -> Self {
        Self::Skipped(MsgViewError::Attachment {
            name: file_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(UNNAMED)
                .to_string(),
            reason: reason.into(),
        })
    }

    /// The extracted attachment, if any.
    pub fn into_attachment(self) -> Option<Attachment> {
        match self {
            Self::Extracted(att) => Some(att),
            Self::Skipped(_) => None,
        }
    }
}

/// Collect extractions in order, logging and dropping the skipped ones.
pub fn collect(extractions: impl IntoIterator<Item = Extraction>) -> Vec<Attachment> {
    let mut kept = Vec::new();
    let mut skipped = 0usize;

    for extraction in extractions {
        match extraction {
            Extraction::Extracted(att) => kept.push(att),
            Extraction::Skipped(err) => {
                skipped += 1;
                tracing::warn!(error = %err, "Failed to extract attachment");
            }
        }
    }

    tracing::debug!(kept = kept.len(), skipped, "Attachments extracted");
    kept
}
