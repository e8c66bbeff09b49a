//! Outlook `.msg` container decoding.
//!
//! An Outlook message is an OLE compound file. Every MAPI property lives either
//! inline in a `__properties_version1.0` stream (fixed-size values) or in its own
//! `__substg1.0_IIIITTTT` stream (strings and binaries), where `IIII` is the
//! property id and `TTTT` its type. Recipients and attachments are sub-storages
//! with the same layout.
//!
//! This module turns the container into a flat [`OutlookMessage`] and knows
//! nothing about how that is presented.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use cfb::CompoundFile;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;

use crate::error::{MsgViewError, Result};
use crate::parser::SourceFormat;

const PROPERTIES_STREAM: &str = "__properties_version1.0";
const NAMEID_STORAGE: &str = "/__nameid_version1.0";
const RECIPIENT_PREFIX: &str = "__recip_version1.0_#";
const ATTACHMENT_PREFIX: &str = "__attach_version1.0_#";

/// Header size of the top-level property stream.
const TOP_LEVEL_HEADER: usize = 32;
/// Header size of an embedded message's property stream.
const EMBEDDED_HEADER: usize = 24;
/// Header size of recipient and attachment property streams.
const CHILD_HEADER: usize = 8;
/// Size of one property entry.
const ENTRY_SIZE: usize = 16;

/// Property types.
pub mod ptype {
    pub const INTEGER16: u16 = 0x0002;
    pub const INTEGER32: u16 = 0x0003;
    pub const BOOLEAN: u16 = 0x000B;
    pub const OBJECT: u16 = 0x000D;
    pub const INTEGER64: u16 = 0x0014;
    pub const STRING8: u16 = 0x001E;
    pub const UNICODE: u16 = 0x001F;
    pub const TIME: u16 = 0x0040;
    pub const BINARY: u16 = 0x0102;
}

/// Property ids used by the viewer.
pub mod tag {
    pub const SUBJECT: u16 = 0x0037;
    pub const CLIENT_SUBMIT_TIME: u16 = 0x0039;
    pub const TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;
    pub const SENDER_NAME: u16 = 0x0C1A;
    pub const SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
    pub const RECIPIENT_TYPE: u16 = 0x0C15;
    pub const MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
    pub const BODY: u16 = 0x1000;
    pub const BODY_HTML: u16 = 0x1013;
    pub const DISPLAY_NAME: u16 = 0x3001;
    pub const EMAIL_ADDRESS: u16 = 0x3003;
    pub const CREATION_TIME: u16 = 0x3007;
    pub const ATTACH_DATA: u16 = 0x3701;
    pub const ATTACH_FILENAME: u16 = 0x3704;
    pub const ATTACH_LONG_FILENAME: u16 = 0x3707;
    pub const ATTACH_MIME_TAG: u16 = 0x370E;
    pub const SMTP_ADDRESS: u16 = 0x39FE;
    pub const INTERNET_CPID: u16 = 0x3FDE;
    pub const MESSAGE_CODEPAGE: u16 = 0x3FFD;
    pub const SENDER_SMTP_ADDRESS: u16 = 0x5D01;
}

/// A decoded Outlook message: the subset of properties a viewer needs.
#[derive(Debug, Clone, Default)]
pub struct OutlookMessage {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub body_html: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub submit_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_smtp_address: Option<String>,
    pub transport_headers: Option<String>,
    pub recipients: Vec<OutlookRecipient>,
    pub attachments: Vec<OutlookAttachment>,
}

/// One entry of the recipient table.
#[derive(Debug, Clone, Default)]
pub struct OutlookRecipient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub smtp_address: Option<String>,
    /// Raw `PR_RECIPIENT_TYPE` value (1 = To, 2 = Cc, 3 = Bcc), if present.
    pub recipient_type: Option<i64>,
}

/// One entry of the attachment table.
#[derive(Debug, Clone, Default)]
pub struct OutlookAttachment {
    pub long_file_name: Option<String>,
    pub file_name: Option<String>,
    pub display_name: Option<String>,
    pub mime_tag: Option<String>,
    pub data: AttachmentData,
}

impl OutlookAttachment {
    /// Best available file name: long, then 8.3, then display name.
    pub fn best_name(&self) -> Option<&str> {
        self.long_file_name
            .as_deref()
            .or(self.file_name.as_deref())
            .or(self.display_name.as_deref())
    }
}

/// Where an attachment's bytes were found.
#[derive(Debug, Clone, Default)]
pub enum AttachmentData {
    /// Plain binary payload.
    Binary(Vec<u8>),
    /// An embedded message, re-packed as a standalone `.msg` container.
    Embedded(Vec<u8>),
    /// No payload at all.
    #[default]
    Missing,
    /// The payload stream exists but could not be read.
    Unreadable(String),
}

/// Decode an Outlook container from memory.
///
/// Fails when the bytes are not a compound file or lack the top-level
/// property stream. Recipient and attachment storages are read leniently.
pub fn decode(data: &[u8]) -> Result<OutlookMessage> {
    let mut comp = CompoundFile::open(Cursor::new(data))
        .map_err(|e| MsgViewError::corrupt(SourceFormat::Msg, format!("not a compound file: {e}")))?;

    let root_props = format!("/{PROPERTIES_STREAM}");
    let raw = read_stream(&mut comp, &root_props).map_err(|e| {
        MsgViewError::corrupt(SourceFormat::Msg, format!("missing message properties: {e}"))
    })?;
    if raw.len() < TOP_LEVEL_HEADER {
        return Err(MsgViewError::corrupt(
            SourceFormat::Msg,
            "message property stream is truncated",
        ));
    }
    let props = PropertyTable::parse(&raw[TOP_LEVEL_HEADER..]);

    let codepage = props
        .int(tag::MESSAGE_CODEPAGE)
        .and_then(|cp| u32::try_from(cp).ok())
        .unwrap_or(1252);
    let mut reader = Reader {
        comp: &mut comp,
        codepage,
    };

    let internet_cpid = props.int(tag::INTERNET_CPID).and_then(|cp| u32::try_from(cp).ok());

    let mut msg = OutlookMessage {
        subject: reader.string("/", tag::SUBJECT),
        body: reader.string("/", tag::BODY),
        body_html: reader.html_body("/", internet_cpid),
        creation_time: props.time(tag::CREATION_TIME),
        submit_time: props.time(tag::CLIENT_SUBMIT_TIME),
        delivery_time: props.time(tag::MESSAGE_DELIVERY_TIME),
        sender_name: reader.string("/", tag::SENDER_NAME),
        sender_email: reader.string("/", tag::SENDER_EMAIL_ADDRESS),
        sender_smtp_address: reader.string("/", tag::SENDER_SMTP_ADDRESS),
        transport_headers: reader.string("/", tag::TRANSPORT_MESSAGE_HEADERS),
        ..Default::default()
    };

    for base in reader.child_storages(RECIPIENT_PREFIX) {
        msg.recipients.push(reader.recipient(&base));
    }
    for base in reader.child_storages(ATTACHMENT_PREFIX) {
        msg.attachments.push(reader.attachment(&base));
    }

    tracing::debug!(
        codepage,
        recipients = msg.recipients.len(),
        attachments = msg.attachments.len(),
        "Decoded Outlook container"
    );
    Ok(msg)
}

/// Reads property streams out of an open container.
struct Reader<'c, F> {
    comp: &'c mut CompoundFile<F>,
    codepage: u32,
}

impl<F: Read + Seek> Reader<'_, F> {
    /// Paths of the root's child storages whose names start with `prefix`,
    /// in id order.
    fn child_storages(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = match self.comp.read_storage("/") {
            Ok(entries) => entries
                .filter(|e| e.is_storage() && e.name().starts_with(prefix))
                .map(|e| e.name().to_string())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list container root");
                Vec::new()
            }
        };
        names.sort_by_key(|n| storage_id(n, prefix));
        names.into_iter().map(|n| format!("/{n}/")).collect()
    }

    /// Property table of a recipient or attachment storage (empty if unreadable).
    fn child_properties(&mut self, base: &str) -> PropertyTable {
        match read_stream(self.comp, &format!("{base}{PROPERTIES_STREAM}")) {
            Ok(raw) if raw.len() >= CHILD_HEADER => PropertyTable::parse(&raw[CHILD_HEADER..]),
            Ok(_) => PropertyTable::default(),
            Err(e) => {
                tracing::debug!(storage = base, error = %e, "No property stream");
                PropertyTable::default()
            }
        }
    }

    fn recipient(&mut self, base: &str) -> OutlookRecipient {
        let props = self.child_properties(base);
        OutlookRecipient {
            name: self.string(base, tag::DISPLAY_NAME),
            email: self.string(base, tag::EMAIL_ADDRESS),
            smtp_address: self.string(base, tag::SMTP_ADDRESS),
            recipient_type: props.int(tag::RECIPIENT_TYPE),
        }
    }

    fn attachment(&mut self, base: &str) -> OutlookAttachment {
        let binary = substg_path(base, tag::ATTACH_DATA, ptype::BINARY);
        let embedded = substg_path(base, tag::ATTACH_DATA, ptype::OBJECT);

        let data = if self.comp.is_stream(&binary) {
            match read_stream(self.comp, &binary) {
                Ok(bytes) => AttachmentData::Binary(bytes),
                Err(e) => AttachmentData::Unreadable(e.to_string()),
            }
        } else if self.comp.is_storage(&embedded) {
            match embedded_message(self.comp, &embedded) {
                Ok(bytes) => AttachmentData::Embedded(bytes),
                Err(e) => AttachmentData::Unreadable(format!("embedded message: {e}")),
            }
        } else {
            AttachmentData::Missing
        };

        OutlookAttachment {
            long_file_name: self.string(base, tag::ATTACH_LONG_FILENAME),
            file_name: self.string(base, tag::ATTACH_FILENAME),
            display_name: self.string(base, tag::DISPLAY_NAME),
            mime_tag: self.string(base, tag::ATTACH_MIME_TAG),
            data,
        }
    }

    /// A string property, preferring the Unicode stream over the 8-bit one.
    fn string(&mut self, base: &str, id: u16) -> Option<String> {
        let unicode = substg_path(base, id, ptype::UNICODE);
        if let Some(bytes) = self.optional_stream(&unicode) {
            return non_empty(decode_utf16(&bytes));
        }
        let ansi = substg_path(base, id, ptype::STRING8);
        let bytes = self.optional_stream(&ansi)?;
        non_empty(decode_codepage(&bytes, self.codepage))
    }

    /// The HTML body: usually binary in the internet code page, sometimes a string.
    fn html_body(&mut self, base: &str, internet_cpid: Option<u32>) -> Option<String> {
        let binary = substg_path(base, tag::BODY_HTML, ptype::BINARY);
        if let Some(bytes) = self.optional_stream(&binary) {
            let text = match internet_cpid {
                Some(cp) => decode_codepage(&bytes, cp),
                None => decode_codepage(&bytes, 65001),
            };
            return non_empty(text);
        }
        self.string(base, tag::BODY_HTML)
    }

    fn optional_stream(&mut self, path: &str) -> Option<Vec<u8>> {
        if !self.comp.is_stream(path) {
            return None;
        }
        match read_stream(self.comp, path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(stream = path, error = %e, "Failed to read property stream");
                None
            }
        }
    }
}

/// Copy the embedded message storage at `base` into a new top-level container.
///
/// The named-property map of the outer message is copied along, since the
/// embedded message shares it. The embedded property header is widened to
/// the top-level layout.
fn embedded_message<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    base: &str,
) -> std::io::Result<Vec<u8>> {
    let root = Path::new(base);
    let mut entries: Vec<(PathBuf, PathBuf, bool)> = comp
        .walk_storage(root)?
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            (!rel.as_os_str().is_empty())
                .then(|| (e.path().to_path_buf(), Path::new("/").join(rel), e.is_stream()))
        })
        .collect();
    if comp.is_storage(NAMEID_STORAGE) {
        entries.extend(
            comp.walk_storage(NAMEID_STORAGE)?
                .map(|e| (e.path().to_path_buf(), e.path().to_path_buf(), e.is_stream())),
        );
    }

    let top_props = Path::new("/").join(PROPERTIES_STREAM);
    let mut out = CompoundFile::create(Cursor::new(Vec::new()))?;
    for (source, target, is_stream) in &entries {
        if !is_stream {
            if !out.is_storage(target) {
                out.create_storage_all(target)?;
            }
            continue;
        }
        if let Some(parent) = target.parent() {
            if !out.is_storage(parent) {
                out.create_storage_all(parent)?;
            }
        }
        let mut data = read_stream(comp, source)?;
        if *target == top_props {
            data = widen_property_header(&data);
        }
        let mut stream = out.create_stream(target)?;
        stream.write_all(&data)?;
        stream.flush()?;
    }
    out.flush()?;

    tracing::debug!(storage = base, entries = entries.len(), "Re-packed embedded message");
    Ok(out.into_inner().into_inner())
}

/// Turn a 24-byte embedded property header into the 32-byte top-level one.
fn widen_property_header(raw: &[u8]) -> Vec<u8> {
    let split = raw.len().min(EMBEDDED_HEADER);
    let mut out = Vec::with_capacity(raw.len() + TOP_LEVEL_HEADER - EMBEDDED_HEADER);
    out.extend_from_slice(&raw[..split]);
    out.resize(TOP_LEVEL_HEADER, 0);
    out.extend_from_slice(&raw[split..]);
    out
}

fn read_stream<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    path: impl AsRef<Path>,
) -> std::io::Result<Vec<u8>> {
    let mut stream = comp.open_stream(path)?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

fn substg_path(base: &str, id: u16, ptype: u16) -> String {
    format!("{base}__substg1.0_{id:04X}{ptype:04X}")
}

/// Numeric id from a `__recip_version1.0_#0000000A` style name.
fn storage_id(name: &str, prefix: &str) -> u32 {
    name.strip_prefix(prefix)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .unwrap_or(u32::MAX)
}

/// Fixed-size property values from a `__properties_version1.0` stream.
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: BTreeMap<u16, (u16, u64)>,
}

impl PropertyTable {
    /// Parse 16-byte entries (type, id, flags, 8-byte value); a trailing
    /// partial entry is ignored.
    pub fn parse(data: &[u8]) -> Self {
        let mut entries = BTreeMap::new();
        for chunk in data.chunks_exact(ENTRY_SIZE) {
            let mut r = Cursor::new(chunk);
            let (Ok(ptype), Ok(id), Ok(_flags), Ok(value)) = (
                r.read_u16::<LittleEndian>(),
                r.read_u16::<LittleEndian>(),
                r.read_u32::<LittleEndian>(),
                r.read_u64::<LittleEndian>(),
            ) else {
                continue;
            };
            entries.entry(id).or_insert((ptype, value));
        }
        Self { entries }
    }

    /// An integer-typed property.
    pub fn int(&self, id: u16) -> Option<i64> {
        let &(ptype, raw) = self.entries.get(&id)?;
        match ptype {
            ptype::INTEGER16 => Some(i64::from(raw as u16 as i16)),
            ptype::INTEGER32 => Some(i64::from(raw as u32 as i32)),
            ptype::INTEGER64 => Some(raw as i64),
            ptype::BOOLEAN => Some(i64::from(raw as u8 != 0)),
            _ => None,
        }
    }

    /// A `PtypTime` property.
    pub fn time(&self, id: u16) -> Option<DateTime<Utc>> {
        match self.entries.get(&id)? {
            &(ptype::TIME, raw) => filetime_to_datetime(raw),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Convert a Windows FILETIME (100 ns ticks since 1601-01-01) to UTC.
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    const TICKS_PER_SECOND: u64 = 10_000_000;
    const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;

    if ticks == 0 {
        return None;
    }
    let secs = i64::try_from(ticks / TICKS_PER_SECOND).ok()? - EPOCH_DIFFERENCE_SECS;
    let nanos = u32::try_from((ticks % TICKS_PER_SECOND) * 100).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

fn decode_utf16(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
    text.trim_end_matches('\0').to_string()
}

fn decode_codepage(bytes: &[u8], codepage: u32) -> String {
    let (text, _, _) = encoding_for_codepage(codepage).decode(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Map a Windows code page number to an `encoding_rs` encoding.
///
/// Unknown code pages fall back to Windows-1252.
pub fn encoding_for_codepage(codepage: u32) -> &'static Encoding {
    match codepage {
        65001 => encoding_rs::UTF_8,
        1200 => encoding_rs::UTF_16LE,
        1201 => encoding_rs::UTF_16BE,
        866 => encoding_rs::IBM866,
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        10000 => encoding_rs::MACINTOSH,
        20866 => encoding_rs::KOI8_R,
        21866 => encoding_rs::KOI8_U,
        28592 => encoding_rs::ISO_8859_2,
        28595 => encoding_rs::ISO_8859_5,
        28597 => encoding_rs::ISO_8859_7,
        28605 => encoding_rs::ISO_8859_15,
        50220 => encoding_rs::ISO_2022_JP,
        51932 => encoding_rs::EUC_JP,
        54936 => encoding_rs::GB18030,
        _ => encoding_rs::WINDOWS_1252,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ptype: u16, id: u16, value: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENTRY_SIZE);
        buf.extend_from_slice(&ptype.to_le_bytes());
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
        buf
    }

    #[test]
    fn test_property_table_int_and_time() {
        let mut data = entry(ptype::INTEGER32, tag::RECIPIENT_TYPE, 2);
        data.extend(entry(ptype::TIME, tag::CREATION_TIME, 133_497_792_000_000_000));
        let table = PropertyTable::parse(&data);
        assert_eq!(table.len(), 2);
        assert_eq!(table.int(tag::RECIPIENT_TYPE), Some(2));
        let time = table.time(tag::CREATION_TIME).unwrap();
        assert_eq!(time.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 08:00");
    }

    #[test]
    fn test_widen_property_header() {
        let mut raw = vec![7u8; EMBEDDED_HEADER];
        raw.extend(entry(ptype::INTEGER32, 0x1234, 5));
        let widened = widen_property_header(&raw);
        assert_eq!(widened.len(), raw.len() + 8);
        assert_eq!(&widened[..EMBEDDED_HEADER], &raw[..EMBEDDED_HEADER]);
        assert_eq!(&widened[EMBEDDED_HEADER..TOP_LEVEL_HEADER], &[0u8; 8]);
        let table = PropertyTable::parse(&widened[TOP_LEVEL_HEADER..]);
        assert_eq!(table.int(0x1234), Some(5));

        assert_eq!(widen_property_header(&[1, 2]).len(), TOP_LEVEL_HEADER);
    }

    #[test]
    fn test_property_table_negative_int32() {
        let data = entry(ptype::INTEGER32, 0x1234, u64::from(u32::MAX));
        assert_eq!(PropertyTable::parse(&data).int(0x1234), Some(-1));
    }

    #[test]
    fn test_property_table_type_mismatch() {
        let data = entry(ptype::BINARY, tag::CREATION_TIME, 42);
        let table = PropertyTable::parse(&data);
        assert!(table.time(tag::CREATION_TIME).is_none());
        assert!(table.int(tag::CREATION_TIME).is_none());
    }

    #[test]
    fn test_property_table_ignores_partial_entry() {
        let mut data = entry(ptype::INTEGER32, 1, 7);
        data.extend_from_slice(&[0xAA; 5]);
        let table = PropertyTable::parse(&data);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_filetime_epoch() {
        assert!(filetime_to_datetime(0).is_none());
        let unix_epoch = filetime_to_datetime(116_444_736_000_000_000).unwrap();
        assert_eq!(unix_epoch.timestamp(), 0);
    }

    #[test]
    fn test_decode_utf16_strips_nul() {
        let bytes: Vec<u8> = "Hé\0".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode_utf16(&bytes), "Hé");
    }

    #[test]
    fn test_decode_codepage() {
        assert_eq!(decode_codepage(b"caf\xe9", 1252), "café");
        assert_eq!(decode_codepage(b"\xcf\xf0\xe8", 1251), "При");
        assert_eq!(decode_codepage("ok ✓".as_bytes(), 65001), "ok ✓");
    }

    #[test]
    fn test_unknown_codepage_falls_back() {
        assert_eq!(encoding_for_codepage(4242), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn test_storage_id_ordering() {
        assert_eq!(storage_id("__recip_version1.0_#0000000A", RECIPIENT_PREFIX), 10);
        assert_eq!(storage_id("__recip_version1.0_#zz", RECIPIENT_PREFIX), u32::MAX);
    }

    #[test]
    fn test_decode_rejects_non_compound() {
        let err = decode(b"plain text, not OLE").unwrap_err();
        assert!(err.to_string().contains("Outlook MSG"));
    }

    #[test]
    fn test_decode_rejects_compound_without_properties() {
        let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        comp.create_stream("/Unrelated").unwrap();
        comp.flush().unwrap();
        let bytes = comp.into_inner().into_inner();
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("missing message properties"));
    }
}
