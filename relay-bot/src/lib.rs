//! # relay-bot
//!
//! The relay binary's library surface: env configuration, HTML/mention
//! sanitization, the notification router, and the stream-to-channel runner.
//! Exposed as a lib so integration tests can drive the router with mock
//! collaborators.

pub mod config;
pub mod router;
pub mod runner;
pub mod sanitize;

pub use config::RelayConfig;
pub use router::NotificationRouter;
pub use sanitize::Sanitizer;
