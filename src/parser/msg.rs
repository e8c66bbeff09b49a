//! Adapter for Outlook `.msg` containers.
//!
//! [`outlook::decode`] does the container work; this module resolves identities,
//! routes recipients, and extracts attachments into a [`MailRecord`].

use crate::error::Result;
use crate::model::address::EmailAddress;
use crate::model::attachment::UNNAMED;
use crate::model::mail::{self, MailRecord};
use crate::parser::attachment::{self, Extraction};
use crate::parser::header;
use crate::parser::identity::{self, IdentityFields};
use crate::parser::outlook::{
    self, AttachmentData, OutlookAttachment, OutlookMessage, OutlookRecipient,
};

/// `PR_RECIPIENT_TYPE` values. `MAPI_TO` (1) and anything unknown route to To.
const MAPI_CC: i64 = 2;
const MAPI_BCC: i64 = 3;

/// MIME type given to re-packed embedded messages.
const OUTLOOK_MIME: &str = "application/vnd.ms-outlook";

/// Parse a raw Outlook container into a [`MailRecord`].
pub fn parse_msg(data: &[u8]) -> Result<MailRecord> {
    let msg = outlook::decode(data)?;
    Ok(normalize(msg))
}

/// Which recipient list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    /// Route a raw type tag. Missing or unrecognized tags go to To.
    pub fn from_tag(tag: Option<i64>) -> Self {
        match tag {
            Some(MAPI_CC) => Self::Cc,
            Some(MAPI_BCC) => Self::Bcc,
            _ => Self::To,
        }
    }
}

/// Build the record from an already decoded container.
pub fn normalize(msg: OutlookMessage) -> MailRecord {
    let sender = mail::sender_or_placeholder(sender_identity(&msg).display());

    let mut to = Vec::new();
    let mut cc = Vec::new();
    let mut bcc = Vec::new();
    for recipient in &msg.recipients {
        let display = recipient_identity(recipient).display();
        if display.is_empty() {
            continue;
        }
        match RecipientKind::from_tag(recipient.recipient_type) {
            RecipientKind::To => to.push(display),
            RecipientKind::Cc => cc.push(display),
            RecipientKind::Bcc => bcc.push(display),
        }
    }

    let raw_headers = msg
        .transport_headers
        .as_deref()
        .map(|h| header::header_map(h.as_bytes()))
        .unwrap_or_default();

    let sent_at = msg.creation_time.or(msg.submit_time).or(msg.delivery_time);
    let body_html = mail::html_or_text(msg.body_html, msg.body.as_deref());
    let attachments = attachment::collect(msg.attachments.into_iter().map(extract));

    tracing::debug!(
        to = to.len(),
        cc = cc.len(),
        bcc = bcc.len(),
        attachments = attachments.len(),
        "Parsed MSG container"
    );

    MailRecord {
        sender,
        to,
        cc,
        bcc,
        subject: mail::subject_or_placeholder(msg.subject.as_deref()),
        sent_at,
        body_html,
        body_text: msg.body.unwrap_or_default(),
        attachments,
        raw_headers,
    }
}

/// Sender name and resolved address.
///
/// A resolved value without `@` is a directory name, not an address: it is
/// shown as a name, and only when no real name exists.
fn sender_identity(msg: &OutlookMessage) -> EmailAddress {
    let name = msg.sender_name.as_deref();
    let resolved = identity::resolve(&IdentityFields {
        address: msg.sender_email.as_deref(),
        alternate: msg.sender_smtp_address.as_deref(),
        name,
    });
    identity_for_display(name, resolved)
}

fn recipient_identity(recipient: &OutlookRecipient) -> EmailAddress {
    let name = recipient.name.as_deref();
    let resolved = identity::resolve(&IdentityFields {
        address: recipient.email.as_deref(),
        alternate: recipient.smtp_address.as_deref(),
        name,
    });
    identity_for_display(name, resolved)
}

/// A name equal to the resolved address collapses to the bare address.
fn identity_for_display(name: Option<&str>, resolved: identity::Resolved) -> EmailAddress {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    if resolved.is_address() {
        let name = name.filter(|n| !n.eq_ignore_ascii_case(&resolved.value));
        EmailAddress::new(name, Some(&resolved.value))
    } else {
        EmailAddress::new(name.or(Some(&resolved.value)), None)
    }
}

fn extract(att: OutlookAttachment) -> Extraction {
    let name = att.best_name().map(str::to_string);
    match att.data {
        AttachmentData::Binary(bytes) => {
            Extraction::from_parts(name.as_deref(), att.mime_tag.as_deref(), Ok(Some(bytes)))
        }
        AttachmentData::Embedded(bytes) => {
            let name = embedded_file_name(name.as_deref());
            let mime = att.mime_tag.as_deref().unwrap_or(OUTLOOK_MIME);
            Extraction::from_parts(Some(&name), Some(mime), Ok(Some(bytes)))
        }
        AttachmentData::Missing => Extraction::from_parts(name.as_deref(), None, Ok(None)),
        AttachmentData::Unreadable(reason) => {
            Extraction::from_parts(name.as_deref(), None, Err(reason))
        }
    }
}

/// `<name>.msg` for a forwarded message; the display name is usually its subject.
fn embedded_file_name(name: Option<&str>) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(UNNAMED);
    if name.to_lowercase().ends_with(".msg") {
        name.to_string()
    } else {
        format!("{name}.msg")
    }
}
