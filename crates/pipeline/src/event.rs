use chrono::{DateTime, Utc};

use crate::types::{ChatId, MessageRef, SenderId};

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Plain text message.
    Text { text: String },
    /// Slash command addressed to this bot, without the leading `/`.
    Command { name: String, args: String },
    /// Inline keyboard button press.
    Callback {
        data: String,
        /// Message carrying the pressed button, when the transport still has it.
        message: Option<MessageRef>,
    },
}

impl EventKind {
    /// Classify a text message as a command or plain text.
    ///
    /// `/cmd@other_bot` is treated as plain text when `bot_username` is known
    /// and does not match, so commands meant for another bot in a group are
    /// not picked up.
    #[must_use]
    pub fn from_text(text: &str, bot_username: Option<&str>) -> Self {
        let plain = || Self::Text {
            text: text.to_string(),
        };

        let Some(body) = text.strip_prefix('/') else {
            return plain();
        };
        let (head, args) = match body.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (body, ""),
        };
        let (name, addressee) = match head.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (head, None),
        };
        if name.is_empty() {
            return plain();
        }
        if let (Some(addressee), Some(me)) = (addressee, bot_username)
            && !addressee.eq_ignore_ascii_case(me)
        {
            return plain();
        }

        Self::Command {
            name: name.to_string(),
            args: args.to_string(),
        }
    }
}

/// A transport event in the shape the pipeline understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: SenderId,
    pub chat: ChatId,
    pub kind: EventKind,
    /// When the user sent it; unknown for button presses.
    pub sent_at: Option<DateTime<Utc>>,
    /// Language reported by the user's client (e.g. `ko`, `en-US`).
    pub client_locale: Option<String>,
}
