//! Pure functions for turning a status body into a model question: strip the
//! HTML markup, strip the bot's own @mention, trim the padding.

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Removes all HTML tags. Mastodon delivers status bodies as markup
/// (`<p>...</p>`, `<br />`, mention anchors); the model gets plain text.
pub fn strip_html(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Sanitizes inbound status bodies for one bot account.
pub struct Sanitizer {
    mention_re: Regex,
}

impl Sanitizer {
    /// `bot_username` is the local username the bot runs as (no leading `@`).
    pub fn new(bot_username: &str) -> Self {
        let pattern = format!(r"(?i)@{}", regex::escape(bot_username));
        Self {
            // Username comes from verify_credentials and escape() guards the
            // rest, so the pattern always compiles.
            mention_re: Regex::new(&pattern).expect("mention pattern"),
        }
    }

    /// Tags out, own mention out (case-insensitive), whitespace trimmed.
    pub fn sanitize(&self, content: &str) -> String {
        let text = strip_html(content);
        let text = self.mention_re.replace_all(&text, "");
        text.trim().to_string()
    }
}
