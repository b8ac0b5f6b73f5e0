//! Integration tests for conversation-tree branching: two replies to the same
//! historical status must produce independent continuations that share only
//! the common prefix.

use relay_core::{Acct, ConversationStore, InMemoryConversationStore, PromptMessage};

fn alice() -> Acct {
    Acct::new("alice", "example.social")
}

/// **Test: Two continuations of one snapshot diverge after the branch point
/// and neither mutates the other or the stored original.**
#[tokio::test]
async fn branches_share_prefix_then_diverge() {
    let store = InMemoryConversationStore::new();
    let base = vec![
        PromptMessage::system("sys"),
        PromptMessage::user("root question"),
        PromptMessage::assistant("root answer"),
    ];
    store.record(&alice(), "root", base.clone()).await.unwrap();

    // Branch A: reply to "root", extend, record under a new id.
    let mut branch_a = store.lookup(&alice(), "root").await.unwrap().unwrap();
    branch_a.push(PromptMessage::user("follow-up A"));
    branch_a.push(PromptMessage::assistant("answer A"));
    store
        .record(&alice(), "st-a", branch_a.clone())
        .await
        .unwrap();

    // Branch B: independently reply to the same "root".
    let mut branch_b = store.lookup(&alice(), "root").await.unwrap().unwrap();
    branch_b.push(PromptMessage::user("follow-up B"));
    branch_b.push(PromptMessage::assistant("answer B"));
    store
        .record(&alice(), "st-b", branch_b.clone())
        .await
        .unwrap();

    let stored_a = store.lookup(&alice(), "st-a").await.unwrap().unwrap();
    let stored_b = store.lookup(&alice(), "st-b").await.unwrap().unwrap();

    // Common prefix up to the branch point.
    assert_eq!(&stored_a[..3], &base[..]);
    assert_eq!(&stored_b[..3], &base[..]);

    // Divergent tails.
    assert_eq!(stored_a[3].content, "follow-up A");
    assert_eq!(stored_b[3].content, "follow-up B");
    assert_ne!(stored_a, stored_b);

    // The branch-point snapshot itself is untouched.
    let root = store.lookup(&alice(), "root").await.unwrap().unwrap();
    assert_eq!(root, base);
}
