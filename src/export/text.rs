//! Render a message as plain text: header block, body, attachment list.

use std::path::{Path, PathBuf};

use crate::config::DisplayConfig;
use crate::error::{MsgViewError, Result};
use crate::model::mail::ParsedMessage;

use super::attachment::{sanitize_filename_part, unique_path};

/// Render `message` for a terminal or a `.txt` file.
///
/// The body is `body_text`. With `prefer_html` set and no plain body, the
/// HTML body is flattened to text instead.
pub fn render_text(message: &ParsedMessage, display: &DisplayConfig) -> String {
    let record = &message.record;
    let mut content = String::new();

    content.push_str(&format!("File:    {}\n", message.file_name));
    if let Some(date) = record.sent_at {
        content.push_str(&format!(
            "Date:    {}\n",
            date.format(&display.date_format)
        ));
    }
    content.push_str(&format!("From:    {}\n", record.sender));
    if !record.to.is_empty() {
        content.push_str(&format!("To:      {}\n", record.to.join(", ")));
    }
    if !record.cc.is_empty() {
        content.push_str(&format!("Cc:      {}\n", record.cc.join(", ")));
    }
    if !record.bcc.is_empty() {
        content.push_str(&format!("Bcc:     {}\n", record.bcc.join(", ")));
    }
    content.push_str(&format!("Subject: {}\n", record.subject));
    content.push_str(&format!("\n{}\n", "-".repeat(72)));

    let body = if record.has_content() {
        record.body_text.clone()
    } else if display.prefer_html && !record.body_html.is_empty() {
        html_to_text(&record.body_html)
    } else {
        String::new()
    };
    if !body.is_empty() {
        content.push('\n');
        content.push_str(body.trim_end());
        content.push('\n');
    }

    if !record.attachments.is_empty() {
        content.push_str(&format!(
            "\n[Attachments: {} file(s), {}]\n",
            record.attachments.len(),
            humansize::format_size(record.attachments_size(), humansize::BINARY)
        ));
        for att in &record.attachments {
            content.push_str(&format!(
                "  - {} ({}, {})\n",
                att.file_name,
                att.mime_type,
                att.human_size()
            ));
        }
    }

    content
}

/// Write the text rendering next to other exports in `output_dir`.
pub fn export_text(
    message: &ParsedMessage,
    display: &DisplayConfig,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| MsgViewError::io(output_dir, e))?;
    let path = unique_path(&output_dir.join(text_filename(message)));
    std::fs::write(&path, render_text(message, display)).map_err(|e| MsgViewError::io(&path, e))?;
    tracing::debug!(path = %path.display(), "Exported text");
    Ok(path)
}

/// `{source stem}.txt`, sanitized.
fn text_filename(message: &ParsedMessage) -> String {
    let stem = Path::new(&message.file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("message");
    format!("{}.txt", sanitize_filename_part(stem, 150))
}

/// Flatten an HTML body into readable text.
///
/// Drops `script`/`style` blocks, turns block elements into line breaks,
/// strips the remaining tags, decodes common entities, and collapses blank runs.
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "br/", "br /"] {
        text = replace_ignore_case(&text, &format!("<{tag}>"), "\n");
    }
    for tag in ["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = replace_ignore_case(&text, &format!("<{tag}>"), "\n");
        text = replace_ignore_case(&text, &format!("<{tag} "), "\n<");
        text = replace_ignore_case(&text, &format!("</{tag}>"), "\n");
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    // `&amp;` last so that "&amp;lt;" stays "&lt;"
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    let mut cleaned = String::with_capacity(decoded.len());
    let mut prev_was_blank = false;
    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove every `<tag ...>...</tag>` block, case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    while let Some(start) = find_ignore_case(remaining, &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match find_ignore_case(after, &close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

fn replace_ignore_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(haystack.len());
    let mut remaining = haystack;
    while let Some(pos) = find_ignore_case(remaining, needle) {
        result.push_str(&remaining[..pos]);
        result.push_str(replacement);
        remaining = &remaining[pos + needle.len()..];
    }
    result.push_str(remaining);
    result
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
