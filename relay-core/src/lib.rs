//! # relay-core
//!
//! Core types and logic for the Mastodon relay bot: account handles, prompt
//! types, the per-user rate limiter, the reply-chain conversation store, exact
//! token accounting, prompt assembly/truncation, and tracing initialization.
//! Transport-agnostic; used by masto-client, openai-client and relay-bot.

pub mod conversation;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod rate_limit;
pub mod tokens;
pub mod types;

pub use conversation::{ConversationStore, InMemoryConversationStore};
pub use error::{RelayError, Result};
pub use logger::init_tracing;
pub use prompt::PromptBuilder;
pub use rate_limit::{Admission, InMemoryUsageStore, RateLimiter, UsageRecord, UsageStore};
pub use tokens::{ModelProfile, TokenCounter};
pub use types::{Acct, Prompt, PromptMessage, Role};
