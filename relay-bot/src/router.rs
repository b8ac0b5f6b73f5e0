//! Notification orchestration: validate, admit, build, complete, reply,
//! record. Every branch is terminal for the notification being handled.

use crate::sanitize::Sanitizer;
use chrono::{DateTime, Utc};
use masto_client::{Notification, StatusPoster};
use openai_client::CompletionClient;
use relay_core::{Acct, Admission, ConversationStore, PromptBuilder, PromptMessage, RateLimiter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// --- Fixed user-facing replies ---
pub const UNSUPPORTED_INSTANCE_REPLY: &str =
    "Sorry, I can only answer users on this instance.";
pub const COMPLETION_FALLBACK_REPLY: &str =
    "I'm having trouble answering your question. Please try asking again.";

/// Truncates to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Routes one notification end to end. Holds the admission-control and
/// conversation state plus the two external collaborators behind their trait
/// seams. One instance handles notifications strictly one at a time (the
/// runner's single consumer), which serializes all per-user state access.
pub struct NotificationRouter {
    home_host: String,
    sanitizer: Sanitizer,
    rate_limiter: RateLimiter,
    prompt_builder: PromptBuilder,
    conversations: Arc<dyn ConversationStore>,
    completions: Arc<dyn CompletionClient>,
    poster: Arc<dyn StatusPoster>,
    max_status_chars: usize,
    max_completion_tokens: u32,
}

impl NotificationRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        home_host: String,
        sanitizer: Sanitizer,
        rate_limiter: RateLimiter,
        prompt_builder: PromptBuilder,
        conversations: Arc<dyn ConversationStore>,
        completions: Arc<dyn CompletionClient>,
        poster: Arc<dyn StatusPoster>,
        max_status_chars: usize,
        max_completion_tokens: u32,
    ) -> Self {
        Self {
            home_host,
            sanitizer,
            rate_limiter,
            prompt_builder,
            conversations,
            completions,
            poster,
            max_status_chars,
            max_completion_tokens,
        }
    }

    /// Handles one notification at the current time.
    pub async fn handle(&self, notification: &Notification) -> anyhow::Result<()> {
        self.handle_at(notification, Utc::now()).await
    }

    /// Handles one notification at an explicit `now` (injectable for tests).
    ///
    /// Decision sequence, each branch terminal:
    /// 1. not a direct mention with exactly one mentioned account → ignore;
    /// 2. foreign instance → fixed unsupported-instance reply;
    /// 3. throttled → log only, no reply;
    /// 4..7. sanitize, build bounded prompt, complete (apology on failure),
    ///    post the handle-prefixed reply truncated to the platform limit;
    /// 8. on successful post, record the snapshot incl. the assistant turn
    ///    under the new status id. A failed post drops the turn.
    pub async fn handle_at(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        // 1. Only direct mentions addressed to the bot alone.
        let Some(status) = &notification.status else {
            return Ok(());
        };
        if notification.kind != "mention"
            || status.visibility != "direct"
            || status.mentions.len() != 1
        {
            debug!(
                kind = %notification.kind,
                visibility = %status.visibility,
                mentions = status.mentions.len(),
                "ignoring notification"
            );
            return Ok(());
        }

        let Some(user) = account_acct(&notification.account) else {
            warn!(url = %notification.account.url, "account url has no host, ignoring");
            return Ok(());
        };

        // 2. Only users on the home instance are supported.
        if user.host != self.home_host {
            info!(user = %user, "user is not on the home instance");
            let reply = format!("{} {}", user.handle(), UNSUPPORTED_INSTANCE_REPLY);
            let reply = truncate_chars(&reply, self.max_status_chars);
            if let Err(e) = self.poster.post_direct_reply(reply, &status.id).await {
                error!(error = %e, user = %user, "failed to send unsupported-instance reply");
            }
            return Ok(());
        }

        // 3. Admission control; throttling is silent to the user.
        if self.rate_limiter.admit(&user, now).await? == Admission::Throttled {
            info!(user = %user, "user exceeded rate limit and is throttled until the window expires");
            return Ok(());
        }

        info!(user = %user, status_id = %status.id, "handling direct mention");

        // 4. Body → question.
        let question = self.sanitizer.sanitize(&status.content);

        // 5. Reconstruct context and bound it to the token budget.
        let mut prompt = self
            .prompt_builder
            .build(&user, status.in_reply_to_id.as_deref(), &question, self.conversations.as_ref())
            .await?;

        // 6. Completion; failures become the fixed apology, which is carried
        // forward (and recorded) exactly like a real answer.
        let response = match self
            .completions
            .complete(&prompt, self.max_completion_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, user = %user, "completion call failed");
                COMPLETION_FALLBACK_REPLY.to_string()
            }
        };

        // 7. Post, prefixed with the sender's handle and capped to the
        // platform limit.
        let reply = format!("{} {}", user.handle(), response);
        let reply = truncate_chars(&reply, self.max_status_chars);
        let posted = match self.poster.post_direct_reply(reply, &status.id).await {
            Ok(posted) => posted,
            Err(e) => {
                // Accepted gap: the turn is dropped, nothing recorded.
                error!(error = %e, user = %user, "failed to post reply; turn dropped");
                return Ok(());
            }
        };

        // 8. Record the post-reply snapshot under the new status id.
        prompt.push(PromptMessage::assistant(response));
        self.conversations.record(&user, &posted.id, prompt).await?;
        Ok(())
    }
}

/// Derives `@username@host` from the notification account. The host comes
/// from the account url, never from `acct` (which omits it for local users).
fn account_acct(account: &masto_client::Account) -> Option<Acct> {
    let url = reqwest::Url::parse(&account.url).ok()?;
    let host = url.host_str()?;
    Some(Acct::new(account.username.clone(), host))
}
