//! Integration tests for text rendering and attachment extraction.

mod common;

use common::{FixtureAttachment, MsgFixture, SAMPLE_EML};

use msgview::config::DisplayConfig;
use msgview::export::{attachment, text};
use msgview::session::Session;

#[test]
fn test_render_msg_as_text() {
    let bytes = common::sample_msg().build();
    let mut session = Session::new();
    let message = session.load(&bytes, "report.msg").unwrap();

    let out = text::render_text(message, &DisplayConfig::default());
    assert!(out.starts_with("File:    report.msg\n"));
    assert!(out.contains("Date:    2024-01-15 08:00\n"));
    assert!(out.contains("From:    Jane Doe <jane@example.com>\n"));
    assert!(out.contains("To:      Bob <bob@example.com>\n"));
    assert!(out.contains("Cc:      Carol <carol@example.com>\n"));
    assert!(out.contains("Subject: Quarterly report\n"));
    assert!(out.contains("\nNumbers attached.\n"));
    assert!(out.contains("[Attachments: 2 file(s)"));
    assert!(out.contains("  - report.pdf (application/pdf, 13 B)"));
}

#[test]
fn test_render_custom_date_format() {
    let mut session = Session::new();
    let message = session.load(SAMPLE_EML.as_bytes(), "reply.eml").unwrap();
    let display = DisplayConfig {
        date_format: "%d/%m/%Y".to_string(),
        ..Default::default()
    };
    let out = text::render_text(message, &display);
    assert!(out.contains("Date:    15/01/2024\n"));
    assert!(out.contains("Subject: Re: café\n"));
}

#[test]
fn test_extract_all_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = common::sample_msg().build();
    let mut session = Session::new();
    let record = &session.load(&bytes, "report.msg").unwrap().record;

    let calls = std::cell::Cell::new(0usize);
    let paths = attachment::export_all_attachments(record, dir.path(), &|_, _| {
        calls.set(calls.get() + 1);
    })
    .unwrap();

    assert_eq!(paths.len(), 2);
    assert_eq!(calls.get(), 3);
    assert_eq!(
        std::fs::read(dir.path().join("notes.txt")).unwrap(),
        b"remember the milk"
    );
    assert_eq!(
        std::fs::read(dir.path().join("report.pdf")).unwrap(),
        b"%PDF-1.4 fake"
    );
}

#[test]
fn test_extract_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = MsgFixture {
        attachments: vec![
            FixtureAttachment {
                long_name: Some("scan.png"),
                data: Some(b"first".to_vec()),
                ..Default::default()
            },
            FixtureAttachment {
                long_name: Some("scan.png"),
                data: Some(b"second".to_vec()),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
    .build();
    let mut session = Session::new();
    let record = &session.load(&bytes, "scans.msg").unwrap().record;

    let out = dir.path().join("nested").join("out");
    let paths = attachment::export_all_attachments(record, &out, &|_, _| {}).unwrap();
    assert_eq!(paths, vec![out.join("scan.png"), out.join("scan_1.png")]);
    assert_eq!(std::fs::read(out.join("scan_1.png")).unwrap(), b"second");

    // A second run keeps counting instead of replacing.
    let again = attachment::export_all_attachments(record, &out, &|_, _| {}).unwrap();
    assert_eq!(again, vec![out.join("scan_2.png"), out.join("scan_3.png")]);
}

#[test]
fn test_extract_unsafe_names_stay_inside_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = MsgFixture {
        attachments: vec![FixtureAttachment {
            long_name: Some("../../evil.sh"),
            data: Some(b"echo".to_vec()),
            ..Default::default()
        }],
        ..Default::default()
    }
    .build();
    let mut session = Session::new();
    let record = &session.load(&bytes, "evil.msg").unwrap().record;

    let paths = attachment::export_all_attachments(record, dir.path(), &|_, _| {}).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].parent(), Some(dir.path()));
}

#[test]
fn test_export_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    let message = session.load(SAMPLE_EML.as_bytes(), "reply.eml").unwrap();

    let path = text::export_text(message, &DisplayConfig::default(), dir.path()).unwrap();
    assert_eq!(path, dir.path().join("reply.txt"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("See attached."));
    assert!(written.contains("  - data.csv (text/csv, 12 B)"));
}
