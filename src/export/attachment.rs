//! Write attachments of a parsed message to disk.

use std::path::{Path, PathBuf};

use crate::error::{MsgViewError, Result};
use crate::model::attachment::{Attachment, UNNAMED};
use crate::model::mail::MailRecord;

/// Write one attachment into `output_dir`, never overwriting an existing file.
pub fn export_attachment(attachment: &Attachment, output_dir: &Path) -> Result<PathBuf> {
    let filename = sanitize_filename_part(&attachment.file_name, 150);
    let path = unique_path(&output_dir.join(filename));
    std::fs::write(&path, attachment.content()).map_err(|e| MsgViewError::io(&path, e))?;
    tracing::debug!(
        path = %path.display(),
        bytes = attachment.size(),
        "Exported attachment"
    );
    Ok(path)
}

/// Write every attachment of `record` into `output_dir`.
///
/// The directory is created if needed. A failure on one attachment is logged
/// and the rest are still written. `progress` is called with `(done, total)`
/// before each attachment and once more at the end.
pub fn export_all_attachments(
    record: &MailRecord,
    output_dir: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<Vec<PathBuf>> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(MsgViewError::Export(format!(
            "{} is not a directory",
            output_dir.display()
        )));
    }
    std::fs::create_dir_all(output_dir).map_err(|e| MsgViewError::io(output_dir, e))?;

    let total = record.attachments.len();
    let mut paths = Vec::with_capacity(total);
    for (i, att) in record.attachments.iter().enumerate() {
        progress(i, total);
        match export_attachment(att, output_dir) {
            Ok(path) => paths.push(path),
            Err(e) => {
                tracing::warn!(
                    filename = %att.file_name,
                    error = %e,
                    "Failed to export attachment"
                );
            }
        }
    }
    progress(total, total);

    tracing::info!(
        dir = %output_dir.display(),
        written = paths.len(),
        total,
        "Exported attachments"
    );
    Ok(paths)
}

/// Make an attachment name safe to use as a single path component.
///
/// Keeps alphanumerics and `-._@`, replaces everything else with `_`, and
/// strips leading dots so the result can never be `..` or a hidden file.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// If `path` already exists, append a counter to make it unique.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut i = 1usize;
    loop {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}
