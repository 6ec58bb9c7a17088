//! Inbound mail data model shared by the parsing, rendering, and delivery
//! crates.

use serde::{Deserialize, Serialize};

/// One mailbox from an address header: display name plus address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    pub name: Option<String>,
    pub address: String,
}

impl MailAddress {
    /// Display form: `Name <addr>` when a name is present, else the bare
    /// address.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("{name} <{}>", self.address),
            _ => self.address.clone(),
        }
    }
}

/// A decoded attachment ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// A parsed inbound email: headers plus at most one HTML and one plain body.
#[derive(Debug, Clone, Default)]
pub struct InboundMail {
    pub from: MailAddress,
    pub to: Vec<MailAddress>,
    pub subject: Option<String>,
    /// Date header rendered as RFC 3339, when present and parseable.
    pub date: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl InboundMail {
    /// Whether the message carries any body at all.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.html.is_some() || self.text.is_some()
    }
}
