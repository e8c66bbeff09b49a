//! Attachments carried by a parsed message.
//!
//! Content is fully decoded and owned; the size is always derived from it.

use std::sync::Arc;

/// Placeholder file name for attachments that carry none.
pub const UNNAMED: &str = "unnamed";

/// Placeholder MIME type for attachments that carry none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// File extensions a viewer can show inline.
const PREVIEWABLE: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "pdf", "txt", "json", "xml", "html", "css", "js",
    "ts", "md",
];

/// A single extracted attachment.
///
/// `size()` is computed from `content()`, so the two can never disagree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Attachment {
    /// File name, or [`UNNAMED`].
    pub file_name: String,

    /// MIME content type, or [`OCTET_STREAM`].
    pub mime_type: String,

    /// Decoded bytes. Shared so that consumers can hold on to them cheaply.
    #[serde(skip)]
    content: Arc<[u8]>,

    /// Mirrors `content.len()`; kept only for serialized output.
    size: u64,
}

impl Attachment {
    /// Build an attachment, substituting placeholders for blank metadata.
    pub fn new(file_name: Option<&str>, mime_type: Option<&str>, content: Vec<u8>) -> Self {
        let file_name = non_blank(file_name).unwrap_or(UNNAMED).to_string();
        let mime_type = non_blank(mime_type).unwrap_or(OCTET_STREAM).to_string();
        let size = content.len() as u64;
        Self {
            file_name,
            mime_type,
            content: content.into(),
            size,
        }
    }

    /// The decoded attachment bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Byte length of the content.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Size formatted for humans (`"1.5 KiB"`).
    pub fn human_size(&self) -> String {
        humansize::format_size(self.size(), humansize::BINARY)
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_lowercase())
    }

    /// Coarse classification by extension, used for icons and listings.
    pub fn kind(&self) -> AttachmentKind {
        match self.extension().as_deref() {
            Some("pdf") => AttachmentKind::Pdf,
            Some("doc" | "docx") => AttachmentKind::Document,
            Some("xls" | "xlsx") => AttachmentKind::Spreadsheet,
            Some("jpg" | "jpeg" | "png" | "gif" | "bmp") => AttachmentKind::Image,
            Some("zip" | "rar" | "7z") => AttachmentKind::Archive,
            Some("mp3" | "wav" | "ogg") => AttachmentKind::Audio,
            Some("mp4" | "avi" | "mov") => AttachmentKind::Video,
            _ => AttachmentKind::Other,
        }
    }

    /// Whether a viewer can render this attachment inline.
    pub fn is_previewable(&self) -> bool {
        self.extension()
            .is_some_and(|ext| PREVIEWABLE.contains(&ext.as_str()))
    }
}

/// Coarse attachment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Pdf,
    Document,
    Spreadsheet,
    Image,
    Archive,
    Audio,
    Video,
    Other,
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
