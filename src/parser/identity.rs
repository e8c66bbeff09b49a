//! Best-effort recovery of an email address from container identity fields.
//!
//! Outlook containers often store an Exchange directory name
//! (`/O=ORG/OU=.../CN=RECIPIENTS/CN=jdoe`) where an SMTP address is expected.
//! This module picks the most usable value out of the available fields.

use std::sync::LazyLock;

use regex::Regex;

/// `local-part@domain` embedded anywhere in free text.
static EMBEDDED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+)")
        .expect("valid embedded-address pattern")
});

/// The identity fields an Outlook sender or recipient may carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFields<'a> {
    /// Primary address field (`PR_EMAIL_ADDRESS` / `PR_SENDER_EMAIL_ADDRESS`).
    pub address: Option<&'a str>,
    /// Alternate address field (`PR_SMTP_ADDRESS` / `PR_SENDER_SMTP_ADDRESS`).
    pub alternate: Option<&'a str>,
    /// Free-text display name.
    pub name: Option<&'a str>,
}

/// Which precedence rule produced the resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Primary address field contains `@`.
    Address,
    /// Alternate address field contains `@`.
    Alternate,
    /// An address embedded in the name field.
    EmbeddedInName,
    /// The name field verbatim.
    Name,
    /// The primary address field verbatim.
    AddressVerbatim,
    /// Nothing usable.
    Empty,
}

/// Result of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub rule: Rule,
}

impl Resolved {
    /// Whether the resolved value looks like a routable address.
    pub fn is_address(&self) -> bool {
        self.value.contains('@')
    }
}

/// Resolve the best email address for an identity.
///
/// Precedence:
/// 1. primary address, if it contains `@`
/// 2. alternate address, if it contains `@`
/// 3. first `local@domain` match inside the name
/// 4. the name verbatim
/// 5. the primary address verbatim
/// 6. empty
pub fn resolve(fields: &IdentityFields<'_>) -> Resolved {
    let address = non_blank(fields.address);
    let alternate = non_blank(fields.alternate);
    let name = non_blank(fields.name);

    let (value, rule) = if let Some(a) = address.filter(|a| a.contains('@')) {
        (a.to_string(), Rule::Address)
    } else if let Some(a) = alternate.filter(|a| a.contains('@')) {
        (a.to_string(), Rule::Alternate)
    } else if let Some(m) = name.and_then(embedded_address) {
        (m.to_string(), Rule::EmbeddedInName)
    } else if let Some(n) = name {
        (n.to_string(), Rule::Name)
    } else if let Some(a) = address {
        (a.to_string(), Rule::AddressVerbatim)
    } else {
        (String::new(), Rule::Empty)
    };

    Resolved { value, rule }
}

/// Convenience wrapper returning only the resolved string.
pub fn resolve_address(fields: &IdentityFields<'_>) -> String {
    resolve(fields).value
}

/// First `local@domain` substring of `text`, if any.
pub fn embedded_address(text: &str) -> Option<&str> {
    EMBEDDED_ADDRESS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
