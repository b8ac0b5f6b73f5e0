//! Prompt assembly and budget truncation.

use crate::conversation::ConversationStore;
use crate::error::Result;
use crate::tokens::TokenCounter;
use crate::types::{Acct, Prompt, PromptMessage};
use tracing::debug;

/// Assembles a new or continued prompt and prunes it to a token budget.
pub struct PromptBuilder {
    counter: TokenCounter,
    model: String,
    system_message: String,
    max_prompt_tokens: usize,
}

impl PromptBuilder {
    pub fn new(
        counter: TokenCounter,
        model: impl Into<String>,
        system_message: impl Into<String>,
        max_prompt_tokens: usize,
    ) -> Self {
        Self {
            counter,
            model: model.into(),
            system_message: system_message.into(),
            max_prompt_tokens,
        }
    }

    /// Builds the prompt for `question`.
    ///
    /// When `reply_to_id` names a recorded snapshot for `user`, that copy is
    /// extended with the question; otherwise (no reply target, or the thread
    /// is unknown/expired) a fresh system + user sequence is started.
    ///
    /// Truncation drops the message at index 1 (the oldest non-system turn)
    /// until the prompt fits `max_prompt_tokens` or a single message remains.
    /// The just-appended question and the system preamble are sacrificed only
    /// in the single-survivor terminal case, favoring recency over history.
    pub async fn build(
        &self,
        user: &Acct,
        reply_to_id: Option<&str>,
        question: &str,
        store: &dyn ConversationStore,
    ) -> Result<Prompt> {
        let mut prompt = match reply_to_id {
            Some(id) => match store.lookup(user, id).await? {
                Some(history) => history,
                None => {
                    debug!(user = %user, status_id = id, "no stored thread, starting fresh");
                    vec![PromptMessage::system(self.system_message.clone())]
                }
            },
            None => vec![PromptMessage::system(self.system_message.clone())],
        };
        prompt.push(PromptMessage::user(question));

        while self.counter.count(&prompt, &self.model)? > self.max_prompt_tokens
            && prompt.len() > 1
        {
            prompt.remove(1);
        }

        Ok(prompt)
    }
}
