//! Adapter for internet-mail documents (`.eml`, RFC 5322 + MIME).
//!
//! Transport decoding is done by `mail-parser`; this module only maps the
//! decoded message onto a [`MailRecord`].

use chrono::{DateTime, Utc};
use mail_parser::{Address, Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{MsgViewError, Result};
use crate::model::address::{display_list, EmailAddress};
use crate::model::mail::{self, MailRecord};
use crate::parser::attachment::{self, Extraction};
use crate::parser::header;
use crate::parser::SourceFormat;

/// Parse a raw internet-mail document into a [`MailRecord`].
///
/// Fails only when the document has no recognizable header block.
pub fn parse_eml(data: &[u8]) -> Result<MailRecord> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(MsgViewError::corrupt(SourceFormat::Eml, "document is empty"));
    }

    if !header::starts_with_header_field(data) {
        return Err(MsgViewError::corrupt(
            SourceFormat::Eml,
            "no message headers found",
        ));
    }

    let msg = MessageParser::default()
        .parse(data)
        .ok_or_else(|| MsgViewError::corrupt(SourceFormat::Eml, "unparseable message structure"))?;

    let from = msg.from().and_then(|a| a.first()).map(addr_to_identity);
    let sender = mail::sender_or_placeholder(from.map(|f| f.display()).unwrap_or_default());

    let to = recipients(msg.to());
    let cc = recipients(msg.cc());
    let bcc = recipients(msg.bcc());

    let body_text = plain_body(&msg);
    let body_html = mail::html_or_text(html_body(&msg), body_text.as_deref());

    let attachments = attachment::collect(msg.attachments().map(extract));

    tracing::debug!(
        to = to.len(),
        cc = cc.len(),
        bcc = bcc.len(),
        attachments = attachments.len(),
        "Parsed EML document"
    );

    Ok(MailRecord {
        sender,
        to,
        cc,
        bcc,
        subject: mail::subject_or_placeholder(msg.subject()),
        sent_at: msg.date().and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0)),
        body_html,
        body_text: body_text.unwrap_or_default(),
        attachments,
        raw_headers: header::header_map(data),
    })
}

fn addr_to_identity(addr: &mail_parser::Addr<'_>) -> EmailAddress {
    EmailAddress::new(addr.name(), addr.address())
}

/// Flatten a recipient header (list or groups) into display strings.
fn recipients(addr: Option<&Address<'_>>) -> Vec<String> {
    let identities: Vec<EmailAddress> = addr
        .map(|a| a.iter().map(addr_to_identity).collect())
        .unwrap_or_default();
    display_list(&identities)
}

/// The first genuine `text/plain` body.
///
/// `mail-parser` synthesizes text from HTML when no plain part exists;
/// that synthesized text is not a plain body and is ignored here.
fn plain_body(msg: &Message<'_>) -> Option<String> {
    match &msg.text_part(0)?.body {
        PartType::Text(text) => Some(text.to_string()),
        _ => None,
    }
}

/// The first genuine `text/html` body.
fn html_body(msg: &Message<'_>) -> Option<String> {
    match &msg.html_part(0)?.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    }
}

/// Turn one MIME attachment part into an [`Extraction`].
fn extract(part: &MessagePart<'_>) -> Extraction {
    let content_type = part.content_type().map(|ct| match ct.subtype() {
        Some(sub) => format!("{}/{}", ct.ctype(), sub),
        None => ct.ctype().to_string(),
    });

    let content = match &part.body {
        PartType::Multipart(_) => None,
        _ => Some(part.contents().to_vec()),
    };

    Extraction::from_parts(part.attachment_name(), content_type.as_deref(), Ok(content))
}
