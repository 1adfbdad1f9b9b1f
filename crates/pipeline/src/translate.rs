//! Shows lookup failures to the user.

use std::sync::Arc;

use {
    tracing::warn,
    whathanzi_i18n::{Localizer, Params},
};

use crate::{
    error::Error,
    messenger::{Messenger, OutgoingText, TextFormat},
    orchestrator::{LookupFailure, Visible},
};

const ERROR_KEY: &str = "error";
const UNKNOWN_ERROR: &str = "unknown error";

/// Replaces whatever the user is looking at with one localized error message.
pub struct ErrorTranslator {
    messenger: Arc<dyn Messenger>,
    localizer: Arc<dyn Localizer>,
}

impl ErrorTranslator {
    #[must_use]
    pub fn new(messenger: Arc<dyn Messenger>, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            messenger,
            localizer,
        }
    }

    /// Localized, HTML-safe error text for `error`.
    #[must_use]
    pub fn render(&self, locale: &str, error: &Error) -> String {
        let params = Params::new().with("err", describe(error));
        self.localizer.translate(locale, ERROR_KEY, &params)
    }

    /// Report `failure` once. A failure to report is logged and swallowed.
    pub async fn report(&self, locale: &str, failure: &LookupFailure) {
        warn!(error = %failure.error, target = %failure.visible, "lookup failed");

        let text = self.render(locale, &failure.error);
        let sent = match failure.visible {
            Visible::Text(message) => {
                self.messenger
                    .edit_text(message, &text, TextFormat::Html)
                    .await
            },
            Visible::Caption(message) => {
                self.messenger
                    .edit_caption(message, &text, TextFormat::Html)
                    .await
            },
            Visible::Nothing(chat) => {
                let message = OutgoingText {
                    text,
                    format: TextFormat::Html,
                    keyboard: Vec::new(),
                };
                self.messenger.reply(chat, message).await.map(|_| ())
            },
        };
        if let Err(e) = sent {
            warn!(error = %e, "failed to report lookup error");
        }
    }
}

fn describe(error: &Error) -> String {
    let text = error.to_string();
    let text = text.trim();
    if text.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        escape_html(text)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
