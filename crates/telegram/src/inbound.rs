//! Telegram updates to pipeline events.

use teloxide::types::{CallbackQuery, Message, User};

use whathanzi_pipeline::{ChatId, EventKind, InboundEvent, MessageRef, SenderId};

/// Text messages only; anything without text or a sender is not for us.
#[must_use]
pub fn from_message(msg: &Message, bot_username: Option<&str>) -> Option<InboundEvent> {
    let text = msg.text()?;
    let from = msg.from.as_ref()?;

    Some(InboundEvent {
        sender: sender(from),
        chat: ChatId(msg.chat.id.0),
        kind: EventKind::from_text(text, bot_username),
        sent_at: Some(msg.date),
        client_locale: from.language_code.clone(),
    })
}

/// Button presses. Telegram does not say when the button was pressed, so
/// the event carries no timestamp.
#[must_use]
pub fn from_callback(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.clone()?;
    let message = query
        .message
        .as_ref()
        .map(|m| MessageRef::new(ChatId(m.chat().id.0), m.id().0));
    // Without the message, answer in the private chat with the presser.
    let chat = match message {
        Some(message) => message.chat,
        None => ChatId(i64::try_from(query.from.id.0).ok()?),
    };

    Some(InboundEvent {
        sender: sender(&query.from),
        chat,
        kind: EventKind::Callback { data, message },
        sent_at: None,
        client_locale: query.from.language_code.clone(),
    })
}

fn sender(user: &User) -> SenderId {
    SenderId(user.id.0)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn message(text: serde_json::Value) -> Message {
        let mut value = json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Mina" },
            "from": {
                "id": 1001,
                "is_bot": false,
                "first_name": "Mina",
                "language_code": "ko"
            }
        });
        if !text.is_null() {
            value["text"] = text;
        }
        serde_json::from_value(value).expect("deserialize message")
    }

    #[test]
    fn text_message_becomes_text_event() {
        let event = from_message(&message(json!("何字 中")), Some("hanzi_bot")).unwrap();

        assert_eq!(event.sender, SenderId(1001));
        assert_eq!(event.chat, ChatId(42));
        assert_eq!(event.kind, EventKind::Text {
            text: "何字 中".into()
        });
        assert_eq!(event.sent_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(event.client_locale.as_deref(), Some("ko"));
    }

    #[test]
    fn slash_command_becomes_command_event() {
        let event = from_message(&message(json!("/lang@hanzi_bot")), Some("hanzi_bot")).unwrap();
        assert_eq!(event.kind, EventKind::Command {
            name: "lang".into(),
            args: String::new(),
        });
    }

    #[test]
    fn non_text_messages_are_skipped() {
        assert!(from_message(&message(serde_json::Value::Null), None).is_none());
    }

    #[test]
    fn callback_carries_message_and_no_timestamp() {
        let query: CallbackQuery = serde_json::from_value(json!({
            "id": "cb-1",
            "from": { "id": 1001, "is_bot": false, "first_name": "Mina", "language_code": "ja" },
            "chat_instance": "ci",
            "data": "riks_中",
            "message": {
                "message_id": 77,
                "date": 1_700_000_000,
                "chat": { "id": -100123, "type": "supergroup", "title": "hanzi" },
                "text": "Which dictionary should I search?"
            }
        }))
        .expect("deserialize callback query");

        let event = from_callback(&query).unwrap();
        assert_eq!(event.chat, ChatId(-100_123));
        assert_eq!(event.kind, EventKind::Callback {
            data: "riks_中".into(),
            message: Some(MessageRef::new(ChatId(-100_123), 77)),
        });
        assert!(event.sent_at.is_none());
        assert_eq!(event.client_locale.as_deref(), Some("ja"));
    }

    #[test]
    fn callback_without_message_answers_privately() {
        let query: CallbackQuery = serde_json::from_value(json!({
            "id": "cb-2",
            "from": { "id": 1001, "is_bot": false, "first_name": "Mina" },
            "chat_instance": "ci",
            "data": "lang_kr"
        }))
        .expect("deserialize callback query");

        let event = from_callback(&query).unwrap();
        assert_eq!(event.chat, ChatId(1001));
        assert_eq!(event.kind, EventKind::Callback {
            data: "lang_kr".into(),
            message: None,
        });
    }

    #[test]
    fn callback_without_data_is_skipped() {
        let query: CallbackQuery = serde_json::from_value(json!({
            "id": "cb-3",
            "from": { "id": 1001, "is_bot": false, "first_name": "Mina" },
            "chat_instance": "ci",
            "game_short_name": "g"
        }))
        .expect("deserialize callback query");
        assert!(from_callback(&query).is_none());
    }
}
