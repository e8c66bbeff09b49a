//! Synthetic Outlook `.msg` and `.eml` inputs built in memory.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use cfb::CompoundFile;

const PT_LONG: u16 = 0x0003;
const PT_SYSTIME: u16 = 0x0040;
const PT_UNICODE: u16 = 0x001F;
const PT_BINARY: u16 = 0x0102;

/// FILETIME for 2024-01-15 08:00:00 UTC.
pub const JAN_15_2024: u64 = 133_497_792_000_000_000;

#[derive(Debug, Default, Clone)]
pub struct FixtureRecipient {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub smtp: Option<&'static str>,
    pub kind: Option<u32>,
}

#[derive(Debug, Default, Clone)]
pub struct FixtureAttachment {
    pub long_name: Option<&'static str>,
    pub mime: Option<&'static str>,
    /// `None` leaves the data stream out entirely.
    pub data: Option<Vec<u8>>,
    /// Store an embedded message with this subject instead of bytes.
    pub embedded_subject: Option<&'static str>,
}

/// Describes an Outlook message; [`MsgFixture::build`] turns it into container bytes.
#[derive(Debug, Default, Clone)]
pub struct MsgFixture {
    pub subject: Option<&'static str>,
    pub body: Option<&'static str>,
    pub html: Option<&'static str>,
    pub sender_name: Option<&'static str>,
    pub sender_email: Option<&'static str>,
    pub sender_smtp: Option<&'static str>,
    pub transport_headers: Option<&'static str>,
    pub creation_time: Option<u64>,
    pub submit_time: Option<u64>,
    pub recipients: Vec<FixtureRecipient>,
    pub attachments: Vec<FixtureAttachment>,
}

impl MsgFixture {
    pub fn build(&self) -> Vec<u8> {
        let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();

        let mut entries = Vec::new();
        if let Some(t) = self.creation_time {
            entries.push(prop_entry(PT_SYSTIME, 0x3007, t));
        }
        if let Some(t) = self.submit_time {
            entries.push(prop_entry(PT_SYSTIME, 0x0039, t));
        }
        write_properties(&mut comp, "/", 32, &entries);

        write_string(&mut comp, "/", 0x0037, self.subject);
        write_string(&mut comp, "/", 0x1000, self.body);
        write_string(&mut comp, "/", 0x0C1A, self.sender_name);
        write_string(&mut comp, "/", 0x0C1F, self.sender_email);
        write_string(&mut comp, "/", 0x5D01, self.sender_smtp);
        write_string(&mut comp, "/", 0x007D, self.transport_headers);
        if let Some(html) = self.html {
            write_stream(&mut comp, &substg("/", 0x1013, PT_BINARY), html.as_bytes());
        }

        for (i, r) in self.recipients.iter().enumerate() {
            let base = format!("/__recip_version1.0_#{i:08X}/");
            comp.create_storage(base.trim_end_matches('/')).unwrap();
            let entries: Vec<_> = r
                .kind
                .map(|k| prop_entry(PT_LONG, 0x0C15, u64::from(k)))
                .into_iter()
                .collect();
            write_properties(&mut comp, &base, 8, &entries);
            write_string(&mut comp, &base, 0x3001, r.name);
            write_string(&mut comp, &base, 0x3003, r.email);
            write_string(&mut comp, &base, 0x39FE, r.smtp);
        }

        for (i, a) in self.attachments.iter().enumerate() {
            let base = format!("/__attach_version1.0_#{i:08X}/");
            comp.create_storage(base.trim_end_matches('/')).unwrap();
            write_properties(&mut comp, &base, 8, &[]);
            write_string(&mut comp, &base, 0x3707, a.long_name);
            write_string(&mut comp, &base, 0x370E, a.mime);
            if let Some(subject) = a.embedded_subject {
                let inner = substg(&base, 0x3701, 0x000D);
                comp.create_storage(&inner).unwrap();
                let inner = format!("{inner}/");
                write_properties(&mut comp, &inner, 24, &[]);
                write_string(&mut comp, &inner, 0x0037, Some(subject));
            } else if let Some(data) = &a.data {
                write_stream(&mut comp, &substg(&base, 0x3701, PT_BINARY), data);
            }
        }

        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }
}

fn prop_entry(ptype: u16, id: u16, value: u64) -> [u8; 16] {
    let mut entry = [0u8; 16];
    entry[0..2].copy_from_slice(&ptype.to_le_bytes());
    entry[2..4].copy_from_slice(&id.to_le_bytes());
    entry[4..8].copy_from_slice(&6u32.to_le_bytes());
    entry[8..16].copy_from_slice(&value.to_le_bytes());
    entry
}

fn write_properties(
    comp: &mut CompoundFile<Cursor<Vec<u8>>>,
    base: &str,
    header: usize,
    entries: &[[u8; 16]],
) {
    let mut data = vec![0u8; header];
    for e in entries {
        data.extend_from_slice(e);
    }
    write_stream(comp, &format!("{base}__properties_version1.0"), &data);
}

fn write_string(
    comp: &mut CompoundFile<Cursor<Vec<u8>>>,
    base: &str,
    id: u16,
    value: Option<&str>,
) {
    if let Some(value) = value {
        let bytes: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        write_stream(comp, &substg(base, id, PT_UNICODE), &bytes);
    }
}

fn write_stream(comp: &mut CompoundFile<Cursor<Vec<u8>>>, path: &str, data: &[u8]) {
    let mut stream = comp.create_stream(path).unwrap();
    stream.write_all(data).unwrap();
    stream.flush().unwrap();
}

fn substg(base: &str, id: u16, ptype: u16) -> String {
    format!("{base}__substg1.0_{id:04X}{ptype:04X}")
}

/// A typical Outlook message: one To and one Cc recipient, two attachments.
pub fn sample_msg() -> MsgFixture {
    MsgFixture {
        subject: Some("Quarterly report"),
        body: Some("Numbers attached.\r\n"),
        html: Some("<html><body><p>Numbers attached.</p></body></html>"),
        sender_name: Some("Jane Doe"),
        sender_email: Some("jane@example.com"),
        transport_headers: Some(
            "Received: from mx.example.com\r\n\tby mail.example.com\r\nX-Mailer: Outlook\r\n",
        ),
        creation_time: Some(JAN_15_2024),
        recipients: vec![
            FixtureRecipient {
                name: Some("Bob"),
                email: Some("bob@example.com"),
                kind: Some(1),
                ..Default::default()
            },
            FixtureRecipient {
                name: Some("Carol"),
                email: Some("carol@example.com"),
                kind: Some(2),
                ..Default::default()
            },
        ],
        attachments: vec![
            FixtureAttachment {
                long_name: Some("report.pdf"),
                mime: Some("application/pdf"),
                data: Some(b"%PDF-1.4 fake".to_vec()),
                ..Default::default()
            },
            FixtureAttachment {
                long_name: Some("notes.txt"),
                mime: Some("text/plain"),
                data: Some(b"remember the milk".to_vec()),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// A multipart internet-mail document with one attachment.
pub const SAMPLE_EML: &str = "From: Jane Doe <jane@example.com>\r\n\
To: Bob <bob@example.com>, carol@example.com\r\n\
Cc: Dave <dave@example.com>\r\n\
Subject: =?UTF-8?B?UmU6IGNhZsOp?=\r\n\
Date: Mon, 15 Jan 2024 08:00:00 +0000\r\n\
Message-ID: <abc@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
See attached.\r\n\
--XYZ\r\n\
Content-Type: text/csv; name=\"data.csv\"\r\n\
Content-Disposition: attachment; filename=\"data.csv\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
YSxiLGMKMSwyLDMK\r\n\
--XYZ--\r\n";
