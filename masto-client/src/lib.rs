//! # masto-client
//!
//! Mastodon collaborator for the relay bot: credential verification (login),
//! the server-sent-events user notification stream, and direct-reply posting.
//! The router depends only on the [`StatusPoster`] trait so tests can swap in
//! a mock transport.

pub mod client;
pub mod stream;
pub mod types;

pub use client::{MastoClient, MastoError, StatusPoster};
pub use stream::NotificationStream;
pub use types::{Account, CredentialAccount, Mention, Notification, PostedStatus, Status};
