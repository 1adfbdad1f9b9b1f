//! Config schema types.
use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatHanziConfig {
    pub bot: BotConfig,
    pub i18n: I18nConfig,
    pub dictionary: DictionaryConfig,
    pub renderer: RendererConfig,
    pub sessions: SessionsConfig,
    pub locale_store: LocaleStoreConfig,
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Seconds after which an unanswered message is ignored. 0 or absent
    /// answers everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_timeout: Option<u64>,

    /// Long-poll wait for `getUpdates`, in seconds.
    pub poll_timeout_secs: u32,

    /// Bot API base URL, for a self-hosted Bot API server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            answer_timeout: None,
            poll_timeout_secs: 30,
            api_url: None,
        }
    }
}

impl BotConfig {
    /// The staleness window, `None` when disabled.
    #[must_use]
    pub fn answer_timeout(&self) -> Option<Duration> {
        self.answer_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[REDACTED]")
            .field("answer_timeout", &self.answer_timeout)
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Locale used when neither an override nor the client reports one.
    pub default_locale: String,
    /// Directory of `<locale>.yaml` files layered over the built-in catalogs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".into(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// SQLite connection URL.
    pub database_url: String,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://riksdb.sqlite".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Rasterizer URL template; `{codepoint}` is the upper-case hex code
    /// point and `{char}` the percent-encoded character.
    pub endpoint: String,
    /// Image shown while a glyph renders.
    pub placeholder_url: String,
    pub timeout_secs: u64,
    /// Longest side of the uploaded image, in pixels.
    pub max_dimension: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/render/{codepoint}".into(),
            placeholder_url: "https://i.ibb.co/9TCF0WZ/loading.png".into(),
            timeout_secs: 30,
            max_dimension: 1024,
        }
    }
}

impl RendererConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub capacity: usize,
    /// Sessions idle for longer than this are evicted. 0 keeps them until
    /// capacity forces them out.
    pub idle_ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            idle_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl SessionsConfig {
    #[must_use]
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_secs > 0).then(|| Duration::from_secs(self.idle_ttl_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleStoreConfig {
    pub capacity: usize,
}

impl Default for LocaleStoreConfig {
    fn default() -> Self {
        Self { capacity: 100_000 }
    }
}
