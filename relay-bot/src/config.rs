//! Relay configuration, loaded once from environment variables at startup.

use anyhow::{bail, Context, Result};
use relay_core::ModelProfile;
use std::env;

/// Default system preamble for fresh conversations.
const DEFAULT_SYSTEM_MESSAGE: &str = "A friendly assistant to help understand Mastodon and \
     board wargames. Be brief and answer in 500 characters or less.";

/// Immutable process-wide configuration. Missing required values fail
/// [`RelayConfig::load`] with a descriptive message; the process must exit
/// non-zero without connecting anywhere.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// INSTANCE_URL (required), e.g. `https://wargamers.social`
    pub instance_url: String,
    /// MAST_API_KEY (required)
    pub mast_api_key: String,
    /// OPENAI_API_KEY (required)
    pub openai_api_key: String,
    /// OPENAI_MODEL; must be a supported model (default gpt-3.5-turbo)
    pub model: String,
    /// SYSTEM_MESSAGE
    pub system_message: String,
    /// MAX_STATUS_CHARS: platform character limit for outbound replies
    pub max_status_chars: usize,
    /// MAX_PROMPT_TOKENS; defaults to the model profile's budget
    pub max_prompt_tokens: usize,
    /// MAX_COMPLETION_TOKENS: cap on the completion length
    pub max_completion_tokens: u32,
    /// RATE_LIMIT: admitted requests per user per window
    pub rate_limit: u32,
    /// RATE_WINDOW_HOURS: rate window duration
    pub rate_window_hours: i64,
    /// LOG_FILE
    pub log_file: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} is not set; it is required to start the relay"))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl RelayConfig {
    /// Loads from environment variables. Call [`validate`](Self::validate)
    /// afterwards to fail fast before any network init.
    pub fn load() -> Result<Self> {
        let instance_url = required("INSTANCE_URL")?;
        let mast_api_key = required("MAST_API_KEY")?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let system_message =
            env::var("SYSTEM_MESSAGE").unwrap_or_else(|_| DEFAULT_SYSTEM_MESSAGE.to_string());

        let default_budget = ModelProfile::for_model(&model)
            .map(|p| p.default_prompt_budget)
            .unwrap_or(0);

        Ok(Self {
            instance_url,
            mast_api_key,
            openai_api_key,
            model,
            system_message,
            max_status_chars: parsed_or("MAX_STATUS_CHARS", 500),
            max_prompt_tokens: parsed_or("MAX_PROMPT_TOKENS", default_budget),
            max_completion_tokens: parsed_or("MAX_COMPLETION_TOKENS", 400),
            rate_limit: parsed_or("RATE_LIMIT", 200),
            rate_window_hours: parsed_or("RATE_WINDOW_HOURS", 24),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/relay-bot.log".to_string()),
        })
    }

    /// Validates the loaded values: the instance URL must parse with a host,
    /// the model must have a tokenizer profile, and limits must be positive.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.instance_url)
            .with_context(|| format!("INSTANCE_URL is not a valid URL: {}", self.instance_url))?;
        if url.host_str().is_none() {
            bail!("INSTANCE_URL has no host: {}", self.instance_url);
        }
        if ModelProfile::for_model(&self.model).is_none() {
            bail!(
                "OPENAI_MODEL '{}' is not supported (no tokenizer profile)",
                self.model
            );
        }
        if self.rate_limit == 0 {
            bail!("RATE_LIMIT must be > 0");
        }
        if self.rate_window_hours <= 0 {
            bail!("RATE_WINDOW_HOURS must be > 0");
        }
        if self.max_prompt_tokens == 0 {
            bail!("MAX_PROMPT_TOKENS must be > 0");
        }
        Ok(())
    }

    /// Host of the home instance, for the unsupported-instance check.
    pub fn home_host(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.instance_url)
            .with_context(|| format!("INSTANCE_URL is not a valid URL: {}", self.instance_url))?;
        url.host_str()
            .map(str::to_string)
            .context("INSTANCE_URL has no host")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required() {
        env::set_var("INSTANCE_URL", "https://wargamers.social");
        env::set_var("MAST_API_KEY", "mast-key");
        env::set_var("OPENAI_API_KEY", "openai-key");
    }

    fn clear_all() {
        for name in [
            "INSTANCE_URL",
            "MAST_API_KEY",
            "OPENAI_API_KEY",
            "OPENAI_MODEL",
            "SYSTEM_MESSAGE",
            "MAX_STATUS_CHARS",
            "MAX_PROMPT_TOKENS",
            "MAX_COMPLETION_TOKENS",
            "RATE_LIMIT",
            "RATE_WINDOW_HOURS",
            "LOG_FILE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn defaults_applied() {
        clear_all();
        set_required();
        let config = RelayConfig::load().unwrap();
        config.validate().unwrap();

        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.rate_limit, 200);
        assert_eq!(config.rate_window_hours, 24);
        assert_eq!(config.max_status_chars, 500);
        assert_eq!(config.max_prompt_tokens, 3_596);
        assert_eq!(config.home_host().unwrap(), "wargamers.social");
    }

    #[test]
    #[serial]
    fn missing_required_is_fatal() {
        clear_all();
        env::set_var("MAST_API_KEY", "mast-key");
        env::set_var("OPENAI_API_KEY", "openai-key");

        let err = RelayConfig::load().unwrap_err();
        assert!(err.to_string().contains("INSTANCE_URL"));
    }

    #[test]
    #[serial]
    fn unsupported_model_rejected_at_validate() {
        clear_all();
        set_required();
        env::set_var("OPENAI_MODEL", "gpt-4o-mini");

        let config = RelayConfig::load().unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    #[serial]
    fn prompt_budget_follows_model_profile() {
        clear_all();
        set_required();
        env::set_var("OPENAI_MODEL", "gpt-4");

        let config = RelayConfig::load().unwrap();
        assert_eq!(config.max_prompt_tokens, 7_692);
    }
}
