//! Core types: account handle, prompt roles and messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully qualified account handle, `@username@host`.
///
/// The host is always carried so that identically named users on different
/// instances never share rate-limit or conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acct {
    pub username: String,
    pub host: String,
}

impl Acct {
    pub fn new(username: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            host: host.into(),
        }
    }

    /// The `@username@host` form used as the map key and as the reply prefix.
    pub fn handle(&self) -> String {
        format!("@{}@{}", self.username, self.host)
    }
}

impl fmt::Display for Acct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}@{}", self.username, self.host)
    }
}

/// Role of a prompt message, as the completion API understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message in a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
    /// Optional participant name; the completion API bills it separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }
}

/// Ordered message sequence submitted to the completion service. A fresh
/// conversation always starts with a system message; after that the sequence
/// alternates user/assistant (produced, not enforced).
pub type Prompt = Vec<PromptMessage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acct_handle_format() {
        let acct = Acct::new("alice", "example.social");
        assert_eq!(acct.handle(), "@alice@example.social");
        assert_eq!(acct.to_string(), "@alice@example.social");
    }

    #[test]
    fn accts_differ_by_host() {
        let a = Acct::new("alice", "one.social");
        let b = Acct::new("alice", "two.social");
        assert_ne!(a, b);
    }

    #[test]
    fn role_as_str() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
