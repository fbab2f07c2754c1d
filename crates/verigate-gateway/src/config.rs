use std::time::Duration;
use thiserror::Error;
use typed_builder::TypedBuilder;
use url::form_urlencoded::byte_serialize;

/// A startup-time configuration problem.
///
/// The process keeps running; every verification request answers with a
/// service error until the configuration is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigFault {
    #[error("bot username is not configured")]
    MissingBotUsername,
    #[error("shortener domain or api key is not configured")]
    MissingShortener,
}

/// Gateway policy, independent of how it was loaded.
#[derive(Debug, Clone, TypedBuilder)]
pub struct GatewayConfig {
    /// Bot username used to build `https://t.me/<bot>?start=verify_<token>`.
    #[builder(default, setter(strip_option(fallback = bot_username_opt), into))]
    pub bot_username: Option<String>,
    /// Verification-session TTL, anchored at the verification record's `created_at`.
    #[builder(default = Duration::from_secs(300))]
    pub session_ttl: Duration,
    /// Redirect-page TTL, anchored at the redirect record's `created_at`.
    #[builder(default = Duration::from_secs(120))]
    pub redirect_ttl: Duration,
    /// Upper bound for each record store call.
    #[builder(default = Duration::from_secs(10))]
    pub store_timeout: Duration,
    /// Authorities accepted by URL validation. Empty accepts any.
    #[builder(default)]
    pub allowed_domains: Vec<String>,
    /// Fail instead of serving the raw deep link when shortening fails.
    #[builder(default = false)]
    pub require_shortlink: bool,
    /// Attach diagnostics to responses.
    #[builder(default = false)]
    pub debug: bool,
    /// Seconds the redirect page waits before refreshing to the target.
    #[builder(default = 2)]
    pub redirect_delay_secs: u32,
}

impl GatewayConfig {
    /// Builds the bot deep link for `verify_token`, if a bot is configured.
    ///
    /// The token is percent-encoded so it stays inside the `start` parameter.
    pub fn deep_link(&self, verify_token: &str) -> Option<String> {
        let token: String = byte_serialize(verify_token.as_bytes()).collect();
        self.bot_username
            .as_deref()
            .filter(|bot| !bot.is_empty())
            .map(|bot| format!("https://t.me/{bot}?start=verify_{token}"))
    }
}
