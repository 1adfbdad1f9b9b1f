use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Long-poll wait passed to `getUpdates`, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u32 = 30;

/// Connection settings for the Telegram bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-poll wait for `getUpdates`.
    pub poll_timeout_secs: u32,

    /// Bot API base URL, for a self-hosted Bot API server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            api_url: None,
        }
    }
}

impl TelegramConfig {
    /// HTTP client timeout: the long-poll wait plus headroom, so the client
    /// never aborts a poll before Telegram answers it.
    #[must_use]
    pub fn client_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.poll_timeout_secs) + 15)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
