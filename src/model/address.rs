//! Sender and recipient identities.

/// A sender or recipient as far as it could be recovered from the source.
///
/// # Examples
/// - name `"Jane Doe"`, address `"jane@x.com"` → `"Jane Doe <jane@x.com>"`
/// - name `""`, address `"jane@x.com"` → `"jane@x.com"`
/// - name `"Jane Doe"`, address `""` → `"Jane Doe"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (may be empty or, for directory entries, not an address at all).
    pub address: String,
}

impl EmailAddress {
    /// Build from optional parts, trimming whitespace.
    pub fn new(display_name: Option<&str>, address: Option<&str>) -> Self {
        Self {
            display_name: display_name.map(str::trim).unwrap_or_default().to_string(),
            address: address.map(str::trim).unwrap_or_default().to_string(),
        }
    }

    /// `true` if neither a name nor an address is known.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_empty() && self.address.is_empty()
    }

    /// Format for display: `"Name <address>"` when both are known,
    /// otherwise whichever is known, otherwise an empty string.
    pub fn display(&self) -> String {
        match (self.display_name.is_empty(), self.address.is_empty()) {
            (false, false) => format!("{} <{}>", self.display_name, self.address),
            (true, false) => self.address.clone(),
            (false, true) => self.display_name.clone(),
            (true, true) => String::new(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Render a list of identities, dropping those that render to nothing.
pub fn display_list<'a>(addrs: impl IntoIterator<Item = &'a EmailAddress>) -> Vec<String> {
    addrs
        .into_iter()
        .map(EmailAddress::display)
        .filter(|s| !s.is_empty())
        .collect()
}
