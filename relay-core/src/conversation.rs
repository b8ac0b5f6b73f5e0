//! Reply-chain conversation state.
//!
//! Each posted reply's id maps to the prompt snapshot that was in effect when
//! that status was created. A later reply to any earlier status restores
//! context as of that point, so one snapshot can spawn several independent
//! branches of the conversation tree.

use crate::error::Result;
use crate::types::{Acct, Prompt};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Keyed storage for per-user prompt snapshots.
///
/// Implementations must provide read-your-writes consistency per key and
/// never hand out aliased state: `lookup` returns an owned copy that callers
/// extend freely without affecting the stored snapshot. Entries are never
/// deleted here; bounding growth (TTL, LRU) is the implementation's concern.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The snapshot recorded under `status_id` for `user`, or `None` if the
    /// thread is unknown (expired, foreign, or never recorded).
    async fn lookup(&self, user: &Acct, status_id: &str) -> Result<Option<Prompt>>;

    /// Stores the post-reply snapshot (including the assistant turn) under
    /// the posted status id, creating the user's sub-map if absent.
    async fn record(&self, user: &Acct, status_id: &str, prompt: Prompt) -> Result<()>;
}

/// In-memory [`ConversationStore`] over a mutex-guarded nested map. Unbounded.
#[derive(Default)]
pub struct InMemoryConversationStore {
    inner: Mutex<HashMap<String, HashMap<String, Prompt>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn lookup(&self, user: &Acct, status_id: &str) -> Result<Option<Prompt>> {
        let map = self.inner.lock().await;
        Ok(map
            .get(&user.handle())
            .and_then(|threads| threads.get(status_id))
            .cloned())
    }

    async fn record(&self, user: &Acct, status_id: &str, prompt: Prompt) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.entry(user.handle())
            .or_default()
            .insert(status_id.to_string(), prompt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptMessage;

    fn alice() -> Acct {
        Acct::new("alice", "example.social")
    }

    #[tokio::test]
    async fn lookup_unknown_returns_none() {
        let store = InMemoryConversationStore::new();
        assert!(store.lookup(&alice(), "123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_then_lookup_round_trips() {
        let store = InMemoryConversationStore::new();
        let prompt = vec![PromptMessage::system("sys"), PromptMessage::user("q")];
        store.record(&alice(), "123", prompt.clone()).await.unwrap();
        assert_eq!(store.lookup(&alice(), "123").await.unwrap(), Some(prompt));
    }

    #[tokio::test]
    async fn looked_up_copy_is_independent_of_stored_snapshot() {
        let store = InMemoryConversationStore::new();
        let prompt = vec![PromptMessage::system("sys")];
        store.record(&alice(), "123", prompt).await.unwrap();

        let mut copy = store.lookup(&alice(), "123").await.unwrap().unwrap();
        copy.push(PromptMessage::user("extra"));
        copy[0].content.push_str(" mutated");

        let stored = store.lookup(&alice(), "123").await.unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "sys");
    }

    #[tokio::test]
    async fn same_status_id_is_scoped_per_user() {
        let store = InMemoryConversationStore::new();
        let bob = Acct::new("bob", "example.social");
        store
            .record(&alice(), "123", vec![PromptMessage::user("from alice")])
            .await
            .unwrap();

        assert!(store.lookup(&bob, "123").await.unwrap().is_none());
    }
}
