//! Raw RFC 5322 header blocks: extraction, folding, and encoded-word decoding.
//!
//! The resulting map is informational only; normalization never reads it.

use std::collections::BTreeMap;

use mail_parser::MessageParser;

/// Build a header map from the start of a raw message (or a bare header block).
///
/// Names keep their original case. When a header repeats, the first value wins.
pub fn header_map(raw: &[u8]) -> BTreeMap<String, String> {
    let raw = strip_bom(raw);
    let end = find_header_end(raw).unwrap_or(raw.len());
    let text = decode_header_bytes(&raw[..end]);

    let mut map = BTreeMap::new();
    for (name, value) in unfold_headers(&text) {
        map.entry(name).or_insert_with(|| decode_encoded_words(&value));
    }
    map
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if data[i..].starts_with(b"\r\n\r\n") {
            return Some(i);
        }
    }
    None
}

/// Whether `raw` opens with an RFC 5322 header field (`Name: value`).
///
/// A leading mbox `From ` envelope line is tolerated. The field name must be
/// printable ASCII without spaces or colons.
pub fn starts_with_header_field(raw: &[u8]) -> bool {
    let mut lines = strip_bom(raw)
        .split(|&b| b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l));
    match lines.next() {
        Some(line) if line.starts_with(b"From ") => lines.next().is_some_and(is_field_line),
        Some(line) => is_field_line(line),
        None => false,
    }
}

fn is_field_line(line: &[u8]) -> bool {
    match line.iter().position(|&b| b == b':') {
        Some(colon) if colon > 0 => line[..colon].iter().all(|b| (33..=126).contains(b)),
        _ => false,
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Join continuation lines (starting with space or tab) onto the previous header.
///
/// Returns `(name, raw_value)` pairs in source order.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                if !last.1.is_empty() {
                    last.1.push(' ');
                }
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                result.push((name.to_string(), value.trim().to_string()));
            }
        }
        // Lines without a colon that are not continuations are skipped
    }

    result
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// The value is wrapped in a minimal message so `mail-parser` does the work.
/// On failure the original text is returned.
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }
    let wrapped = format!("Subject: {input}\n\n");
    MessageParser::default()
        .parse(wrapped.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string))
        .unwrap_or_else(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_header_end() {
        // "From: a@b.com\n" = 14 bytes, "Subject: Hi\n" = 12 bytes
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
    }

    #[test]
    fn test_find_header_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "Subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_header_map_first_wins_and_stops_at_body() {
        let raw = b"Received: one\r\nReceived: two\r\nX-Mailer: Test\r\n\r\nNot-A-Header: body\r\n";
        let map = header_map(raw);
        assert_eq!(map.get("Received").map(String::as_str), Some("one"));
        assert_eq!(map.get("X-Mailer").map(String::as_str), Some("Test"));
        assert!(!map.contains_key("Not-A-Header"));
    }

    #[test]
    fn test_header_map_latin1_fallback() {
        let raw = b"Subject: caf\xe9\n\n";
        let map = header_map(raw);
        assert_eq!(map.get("Subject").map(String::as_str), Some("café"));
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_starts_with_header_field() {
        assert!(starts_with_header_field(b"From: a@b.com\r\n\r\nbody"));
        assert!(starts_with_header_field(b"\xEF\xBB\xBFSubject: hi\n\n"));
        assert!(starts_with_header_field(b"From someone Mon Jan 1 2024\nTo: a@b.com\n\n"));
        assert!(!starts_with_header_field(b"hello world no colon"));
        assert!(!starts_with_header_field(b"hello world: spaces in name"));
        assert!(!starts_with_header_field(b"%PDF-1.4\n%binary"));
        assert!(!starts_with_header_field(b"\x00\x01\x02\xff"));
        assert!(!starts_with_header_field(b": no name"));
        assert!(!starts_with_header_field(b""));
    }

    #[test]
    fn test_plain_value_untouched() {
        assert_eq!(decode_encoded_words("plain text"), "plain text");
    }
}
