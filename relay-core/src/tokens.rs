//! Exact token accounting for chat prompts.
//!
//! Counting must match the completion service's own billing byte for byte:
//! under-counting gets oversized requests rejected upstream, over-counting
//! wastes context. Both supported models bill with the cl100k_base BPE plus a
//! fixed per-message overhead and a final 3-token reply priming.

use crate::error::{RelayError, Result};
use crate::types::Prompt;
use tiktoken_rs::CoreBPE;

/// Tokens the model consumes to prime its reply, charged once per request.
const REPLY_PRIMING_TOKENS: i64 = 3;

/// Per-model accounting constants and defaults.
#[derive(Debug, Clone, Copy)]
pub struct ModelProfile {
    pub name: &'static str,
    /// Fixed overhead billed for every message in the prompt.
    pub tokens_per_message: i64,
    /// Adjustment applied when a message carries a name field. Negative for
    /// gpt-3.5-turbo, where the name replaces the role in billing.
    pub tokens_per_name: i64,
    /// Default request token budget when `MAX_PROMPT_TOKENS` is unset; leaves
    /// headroom for the completion inside the model's context window.
    pub default_prompt_budget: usize,
}

const PROFILES: &[ModelProfile] = &[
    ModelProfile {
        name: "gpt-3.5-turbo",
        tokens_per_message: 4,
        tokens_per_name: -1,
        default_prompt_budget: 3_596,
    },
    ModelProfile {
        name: "gpt-4",
        tokens_per_message: 3,
        tokens_per_name: 1,
        default_prompt_budget: 7_692,
    },
];

impl ModelProfile {
    /// Profile for a supported model name, or `None` for anything else.
    pub fn for_model(model: &str) -> Option<&'static ModelProfile> {
        PROFILES.iter().find(|p| p.name == model)
    }
}

/// Counts prompt tokens for a supported model using the exact cl100k_base
/// subword tokenizer. Stateless once constructed; the BPE tables are the only
/// state and they are immutable.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| RelayError::Tokenizer(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }

    fn text_tokens(&self, text: &str) -> i64 {
        self.bpe.encode_with_special_tokens(text).len() as i64
    }

    /// Total tokens the completion service will bill for `prompt` under
    /// `model`. Unsupported models fail closed with
    /// [`RelayError::UnsupportedModel`]; no heuristic estimate is made.
    pub fn count(&self, prompt: &Prompt, model: &str) -> Result<usize> {
        let profile = ModelProfile::for_model(model)
            .ok_or_else(|| RelayError::UnsupportedModel(model.to_string()))?;

        let mut total: i64 = 0;
        for message in prompt {
            total += profile.tokens_per_message;
            total += self.text_tokens(message.role.as_str());
            total += self.text_tokens(&message.content);
            if let Some(name) = &message.name {
                total += self.text_tokens(name);
                total += profile.tokens_per_name;
            }
        }
        total += REPLY_PRIMING_TOKENS;
        Ok(total.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptMessage;

    #[test]
    fn empty_prompt_costs_only_reply_priming() {
        let counter = TokenCounter::new().unwrap();
        assert_eq!(counter.count(&vec![], "gpt-4").unwrap(), 3);
        assert_eq!(counter.count(&vec![], "gpt-3.5-turbo").unwrap(), 3);
    }

    #[test]
    fn count_matches_per_message_formula() {
        let counter = TokenCounter::new().unwrap();
        let prompt = vec![
            PromptMessage::system("You are helpful."),
            PromptMessage::user("Hello there"),
        ];

        let role_and_content: i64 = prompt
            .iter()
            .map(|m| {
                counter.text_tokens(m.role.as_str()) + counter.text_tokens(&m.content)
            })
            .sum();

        let got = counter.count(&prompt, "gpt-4").unwrap() as i64;
        assert_eq!(got, 2 * 3 + role_and_content + 3);

        let got = counter.count(&prompt, "gpt-3.5-turbo").unwrap() as i64;
        assert_eq!(got, 2 * 4 + role_and_content + 3);
    }

    #[test]
    fn name_field_adjustment_applied() {
        let counter = TokenCounter::new().unwrap();
        let mut message = PromptMessage::user("hi");
        message.name = Some("alice".to_string());
        let named = vec![message];
        let unnamed = vec![PromptMessage::user("hi")];

        let name_tokens = counter.text_tokens("alice");
        let diff = counter.count(&named, "gpt-4").unwrap() as i64
            - counter.count(&unnamed, "gpt-4").unwrap() as i64;
        assert_eq!(diff, name_tokens + 1);

        let diff = counter.count(&named, "gpt-3.5-turbo").unwrap() as i64
            - counter.count(&unnamed, "gpt-3.5-turbo").unwrap() as i64;
        assert_eq!(diff, name_tokens - 1);
    }

    #[test]
    fn unsupported_model_fails_closed() {
        let counter = TokenCounter::new().unwrap();
        let prompt = vec![PromptMessage::user("hi")];
        let err = counter.count(&prompt, "gpt-5-nano").unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedModel(_)));
    }

    #[test]
    fn subword_not_whitespace_counting() {
        let counter = TokenCounter::new().unwrap();
        // One long unspaced word still costs several BPE tokens.
        assert!(counter.text_tokens("antidisestablishmentarianism") > 1);
    }

    #[test]
    fn profile_lookup() {
        assert!(ModelProfile::for_model("gpt-4").is_some());
        assert!(ModelProfile::for_model("gpt-3.5-turbo").is_some());
        assert!(ModelProfile::for_model("gpt-4-turbo").is_none());
    }
}
