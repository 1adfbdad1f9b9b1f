//! Routes decoded requests to their handlers.

use {tracing::warn, whathanzi_i18n::Params};

use crate::{
    error::Result,
    event::EventKind,
    locale::LocaleChoice,
    messenger::{InlineButton, OutgoingText, TextFormat},
    normalizer::NormalizedEvent,
    orchestrator::LookupOrchestrator,
    pipeline::Services,
    request::{Action, Request},
    translate::ErrorTranslator,
    types::MessageRef,
};

const SELECT_DICTIONARY_KEY: &str = "search.select-dic";
const ASK_LOCALE_KEY: &str = "lang.ask";
const LOCALE_CHANGED_KEY: &str = "lang.changed";
const DICTIONARY_BUTTON: &str = "Riksdb";

pub struct Dispatcher<'a> {
    services: &'a Services,
    placeholder_url: &'a str,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(services: &'a Services, placeholder_url: &'a str) -> Self {
        Self {
            services,
            placeholder_url,
        }
    }

    /// Answer one normalized event. Events that decode to nothing are ignored.
    ///
    /// Lookup failures are reported to the user here; the returned error is
    /// for failures nobody has been told about.
    pub async fn dispatch(&self, normalized: &NormalizedEvent) -> Result<()> {
        let Some(request) = Request::decode(&normalized.event.kind) else {
            return Ok(());
        };
        let event = &normalized.event;
        let locale = normalized.locale.as_str();

        match request {
            Request::Query(character) => {
                let prompt = self.services.localizer.t(locale, SELECT_DICTIONARY_KEY);
                let button =
                    InlineButton::new(DICTIONARY_BUTTON, Action::LookupGlyph(character).encode());
                let text = OutgoingText::plain(prompt).with_row(vec![button]);
                self.services.messenger.reply(event.chat, text).await?;
            },
            Request::ChangeLocale => {
                let prompt = self.services.localizer.t(locale, ASK_LOCALE_KEY);
                let buttons = LocaleChoice::ALL
                    .into_iter()
                    .map(|choice| {
                        InlineButton::new(choice.flag(), Action::SetLocale(choice).encode())
                    })
                    .collect();
                let text = OutgoingText::plain(prompt).with_row(buttons);
                self.services.messenger.reply(event.chat, text).await?;
            },
            Request::SelectLocale(choice) => {
                let new_locale = choice.locale_id();
                self.services.locales.set(event.sender, new_locale);

                let Some(message) = triggering_message(&event.kind) else {
                    warn!(sender = %event.sender, "locale changed without a message to edit");
                    return Ok(());
                };
                let params = Params::new().with("lang", new_locale);
                let text = self
                    .services
                    .localizer
                    .translate(new_locale, LOCALE_CHANGED_KEY, &params);
                self.services
                    .messenger
                    .edit_text(message, &text, TextFormat::Plain)
                    .await?;
            },
            Request::LookupGlyph(character) => {
                let Some(message) = triggering_message(&event.kind) else {
                    warn!(
                        sender = %event.sender,
                        %character,
                        "glyph selected without a message to answer"
                    );
                    return Ok(());
                };
                let orchestrator = LookupOrchestrator::new(self.services, self.placeholder_url);
                if let Err(failure) = orchestrator.run(character, locale, message).await {
                    ErrorTranslator::new(
                        self.services.messenger.clone(),
                        self.services.localizer.clone(),
                    )
                    .report(locale, &failure)
                    .await;
                }
            },
        }
        Ok(())
    }
}

fn triggering_message(kind: &EventKind) -> Option<MessageRef> {
    match kind {
        EventKind::Callback { message, .. } => *message,
        EventKind::Text { .. } | EventKind::Command { .. } => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{event::InboundEvent, locale::LocaleStore, session::Session, test_support::*},
    };

    const URL: &str = "https://example.test/loading.png";

    fn normalized(event: InboundEvent, locale: &str) -> NormalizedEvent {
        NormalizedEvent {
            session: Session::new(event.sender, at(0)),
            event,
            locale: locale.into(),
        }
    }

    async fn dispatch(fixture: &Fixture, event: NormalizedEvent) {
        Dispatcher::new(&fixture.services, URL)
            .dispatch(&event)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn query_offers_dictionary_button() {
        let fixture = Fixture::new();
        dispatch(&fixture, normalized(text_event("何字 中"), "en")).await;

        let calls = fixture.messenger.calls();
        assert_eq!(calls.len(), 1);
        let Call::Reply { chat, message, .. } = &calls[0] else {
            panic!("expected reply");
        };
        assert_eq!(*chat, CHAT);
        assert_eq!(message.text, "en:search.select-dic");
        let buttons: Vec<_> = message.buttons().collect();
        assert_eq!(buttons, vec![&InlineButton::new("Riksdb", "riks_中")]);
    }

    #[tokio::test]
    async fn lang_command_offers_six_locales() {
        let fixture = Fixture::new();
        dispatch(&fixture, normalized(command_event("lang"), "ko_KR")).await;

        let calls = fixture.messenger.calls();
        let Call::Reply { message, .. } = &calls[0] else {
            panic!("expected reply");
        };
        assert_eq!(message.text, "ko_KR:lang.ask");
        let payloads: Vec<_> = message.buttons().map(|b| b.payload.as_str()).collect();
        assert_eq!(payloads, vec![
            "lang_cn", "lang_hk", "lang_jp", "lang_kr", "lang_tw", "lang_en"
        ]);
        let labels: Vec<_> = message.buttons().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["🇨🇳", "🇭🇰", "🇯🇵", "🇰🇷", "🇹🇼", "🇺🇸"]);
    }

    #[tokio::test]
    async fn select_locale_stores_and_confirms_in_new_locale() {
        let fixture = Fixture::new();
        let event = callback_event("lang_jp", Some(triggering_message_ref()));
        dispatch(&fixture, normalized(event, "en")).await;

        assert_eq!(fixture.locales.get(SENDER).as_deref(), Some("ja_JP"));
        assert_eq!(fixture.messenger.calls(), vec![Call::EditText {
            message: triggering_message_ref(),
            text: "ja_JP:lang.changed{lang=ja_JP}".into(),
            format: TextFormat::Plain,
        }]);
    }

    #[tokio::test]
    async fn unknown_locale_code_means_english() {
        let fixture = Fixture::new();
        let event = callback_event("lang_zz", Some(triggering_message_ref()));
        dispatch(&fixture, normalized(event, "ko_KR")).await;

        assert_eq!(fixture.locales.get(SENDER).as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn select_locale_without_message_still_stores() {
        let fixture = Fixture::new();
        dispatch(&fixture, normalized(callback_event("lang_kr", None), "en")).await;

        assert_eq!(fixture.locales.get(SENDER).as_deref(), Some("ko_KR"));
        assert!(fixture.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let fixture = Fixture::new();
        dispatch(&fixture, normalized(text_event("hello"), "en")).await;
        dispatch(&fixture, normalized(command_event("start"), "en")).await;
        dispatch(
            &fixture,
            normalized(callback_event("other", Some(triggering_message_ref())), "en"),
        )
        .await;
        assert!(fixture.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_not_returned() {
        let fixture = Fixture::new().with_broken_dictionary();
        let event = callback_event("riks_中", Some(triggering_message_ref()));
        dispatch(&fixture, normalized(event, "en")).await;

        let calls = fixture.messenger.calls();
        assert_eq!(calls.len(), 1);
        let Call::EditText { text, format, .. } = &calls[0] else {
            panic!("expected error edit");
        };
        assert!(text.starts_with("en:error{err="));
        assert_eq!(*format, TextFormat::Html);
    }

    #[tokio::test]
    async fn reply_failure_propagates() {
        let fixture = Fixture::new().with_messenger(RecordingMessenger::failing_on(&["reply"]));
        let event = normalized(text_event("何字 中"), "en");
        let result = Dispatcher::new(&fixture.services, URL).dispatch(&event).await;
        assert!(result.is_err());
    }
}
