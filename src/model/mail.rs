//! The normalized email record shared by both source formats.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::attachment::Attachment;

/// Sender placeholder when neither a name nor an address could be recovered.
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Subject placeholder when the source has none.
pub const NO_SUBJECT: &str = "(No Subject)";

/// One email, reduced to what a viewer needs.
///
/// Built once per file by one of the adapters in [`crate::parser`] and
/// never modified afterwards.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MailRecord {
    /// `"Name <address>"`, a bare name or address, or [`UNKNOWN_SENDER`].
    pub sender: String,

    /// Primary recipients, in source order. Never contains empty strings.
    pub to: Vec<String>,

    /// Carbon-copy recipients.
    pub cc: Vec<String>,

    /// Blind-copy recipients.
    pub bcc: Vec<String>,

    /// Subject line, or [`NO_SUBJECT`].
    pub subject: String,

    /// When the message was written or sent, if the source says.
    pub sent_at: Option<DateTime<Utc>>,

    /// Rich body; falls back to the plain body, then to empty.
    pub body_html: String,

    /// Plain body; empty when the source has none.
    pub body_text: String,

    /// Attachments in source enumeration order.
    pub attachments: Vec<Attachment>,

    /// Best-effort header map. Informational only.
    pub raw_headers: BTreeMap<String, String>,
}

impl MailRecord {
    /// `true` if there is any plain-text content to show.
    ///
    /// Renderers gate on this rather than on `body_html`.
    pub fn has_content(&self) -> bool {
        !self.body_text.is_empty()
    }

    /// Sum of all attachment sizes.
    pub fn attachments_size(&self) -> u64 {
        self.attachments.iter().map(Attachment::size).sum()
    }
}

/// A record together with the name of the file it came from.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParsedMessage {
    pub file_name: String,
    #[serde(flatten)]
    pub record: MailRecord,
}

/// Choose the HTML body, falling back to the plain body, then to empty.
pub(crate) fn html_or_text(html: Option<String>, text: Option<&str>) -> String {
    html.filter(|h| !h.is_empty())
        .or_else(|| text.map(str::to_string))
        .unwrap_or_default()
}

/// Substitute the subject placeholder for a missing or blank subject.
pub(crate) fn subject_or_placeholder(subject: Option<&str>) -> String {
    match subject.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NO_SUBJECT.to_string(),
    }
}

/// Substitute the sender placeholder for an empty display string.
pub(crate) fn sender_or_placeholder(display: String) -> String {
    if display.is_empty() {
        UNKNOWN_SENDER.to_string()
    } else {
        display
    }
}
