use anyhow::Context;
use chrono::Duration;
use masto_client::MastoClient;
use openai_client::OpenAIClient;
use relay_bot::{config::RelayConfig, router::NotificationRouter, runner, sanitize::Sanitizer};
use relay_core::{
    init_tracing, InMemoryConversationStore, InMemoryUsageStore, PromptBuilder, RateLimiter,
    TokenCounter,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Completion-call timeout; the API occasionally stalls and the relay must
/// not hang a notification forever.
const COMPLETION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = RelayConfig::load()?;
    config.validate()?;

    if let Some(parent) = Path::new(&config.log_file).parent() {
        std::fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    init_tracing(&config.log_file)?;

    let (client, account) = MastoClient::connect(&config.instance_url, &config.mast_api_key)
        .await
        .context("unable to connect to the instance")?;

    info!(
        instance = %config.instance_url,
        username = %account.username,
        model = %config.model,
        "relay starting"
    );

    let rate_limiter = RateLimiter::new(
        Arc::new(InMemoryUsageStore::new()),
        config.rate_limit,
        Duration::hours(config.rate_window_hours),
    )?;
    let prompt_builder = PromptBuilder::new(
        TokenCounter::new()?,
        config.model.clone(),
        config.system_message.clone(),
        config.max_prompt_tokens,
    );
    let completions = Arc::new(OpenAIClient::new(
        config.openai_api_key.clone(),
        config.model.clone(),
        COMPLETION_TIMEOUT,
    ));

    let router = NotificationRouter::new(
        config.home_host()?,
        Sanitizer::new(&account.username),
        rate_limiter,
        prompt_builder,
        Arc::new(InMemoryConversationStore::new()),
        completions,
        Arc::new(client.clone()),
        config.max_status_chars,
        config.max_completion_tokens,
    );

    runner::run(client, router).await
}
