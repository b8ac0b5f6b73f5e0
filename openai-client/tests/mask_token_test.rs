//! Unit tests for [`openai_client::mask_token`].
//!
//! API keys appear in request logs only in masked form: first 7 chars +
//! `***` + last 4 chars, or `***` outright for keys of length <= 11.

use openai_client::mask_token;

/// **Test: Short or empty keys are fully masked.**
#[test]
fn short_keys_fully_masked() {
    assert_eq!(mask_token(""), "***");
    assert_eq!(mask_token("x"), "***");
    assert_eq!(mask_token("sk-1234"), "***");
    assert_eq!(mask_token("sk-12345678"), "***");
}

/// **Test: Long keys keep only head and tail visible.**
#[test]
fn long_keys_show_head_and_tail() {
    assert_eq!(mask_token("sk-abcdefghijklmnop"), "sk-abcd***mnop");
    let key = "sk-proj-1234567890abcdefghijklmnop";
    let masked = mask_token(key);
    assert!(masked.starts_with("sk-proj"));
    assert!(masked.ends_with("mnop"));
    assert_eq!(masked.len(), 7 + 3 + 4);
}

/// **Test: Masked output never contains the middle of the key.**
#[test]
fn middle_of_key_never_leaks() {
    let key = "sk-proj-SECRETMIDDLESEGMENT-tail";
    assert!(!mask_token(key).contains("SECRETMIDDLE"));
}
