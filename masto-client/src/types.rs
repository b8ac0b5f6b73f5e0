//! Mastodon API payload types, limited to the fields the relay reads.

use serde::Deserialize;

/// The account a notification originates from.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// Webfinger-style `user` or `user@host`; the host is authoritative in
    /// `url`, so the relay derives the handle from `url` + `username`.
    pub acct: String,
    pub url: String,
}

/// One mentioned account inside a status.
#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    pub id: String,
    pub username: String,
    pub acct: String,
}

/// A status as delivered inside a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: String,
    pub in_reply_to_id: Option<String>,
    pub visibility: String,
    /// HTML body; sanitized before use.
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

/// A notification event from the user stream.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub account: Account,
    pub status: Option<Status>,
}

/// The bot's own account, from credential verification at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialAccount {
    pub id: String,
    pub username: String,
    pub acct: String,
}

/// Response to posting a status; only the id is used (as the conversation
/// store key for the new turn).
#[derive(Debug, Clone, Deserialize)]
pub struct PostedStatus {
    pub id: String,
}
