//! The two-stage reply for a glyph selection.
//!
//! The triggering message is replaced by a placeholder photo while the glyph
//! renders, then the placeholder's media is swapped for the rendered image.
//! Each lookup makes exactly one transition out of `Pending` and then stops.

use std::fmt;

use {
    tracing::{debug, info, warn},
    whathanzi_dictionary::{DictionaryRecord, format_code_point},
    whathanzi_i18n::Params,
};

use crate::{
    error::Error,
    messenger::TextFormat,
    pipeline::Services,
    types::{ChatId, MessageRef},
};

const NO_RESULT_KEY: &str = "search.no-result";
const CAPTION_KEY: &str = "search.riksdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupState {
    Pending,
    Rendering,
    NoResult,
    Failed,
    Done,
}

impl fmt::Display for LookupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::NoResult => "no_result",
            Self::Failed => "failed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The dictionary has no entry; the triggering message says so.
    NoResult,
    /// The rendered glyph replaced the placeholder.
    Delivered { placeholder: MessageRef },
}

/// The message the user currently sees for this lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visible {
    /// The triggering text message, before any placeholder exists.
    Text(MessageRef),
    /// The placeholder photo.
    Caption(MessageRef),
    /// The triggering message was deleted and no placeholder replaced it.
    Nothing(ChatId),
}

impl fmt::Display for Visible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(message) => write!(f, "text {message}"),
            Self::Caption(message) => write!(f, "caption {message}"),
            Self::Nothing(chat) => write!(f, "chat {chat}"),
        }
    }
}

#[derive(Debug)]
pub struct LookupFailure {
    pub error: Error,
    pub visible: Visible,
}

pub struct LookupOrchestrator<'a> {
    services: &'a Services,
    placeholder_url: &'a str,
}

impl<'a> LookupOrchestrator<'a> {
    #[must_use]
    pub fn new(services: &'a Services, placeholder_url: &'a str) -> Self {
        Self {
            services,
            placeholder_url,
        }
    }

    /// Look `character` up and answer in place of `triggering`.
    pub async fn run(
        &self,
        character: char,
        locale: &str,
        triggering: MessageRef,
    ) -> Result<LookupOutcome, LookupFailure> {
        let code_point = u32::from(character);
        let code = format_code_point(code_point);
        info!("Request {code}, Locale {locale}");

        let mut state = LookupState::Pending;
        let failed = |state: &mut LookupState, error: Error, visible: Visible| {
            transition(&code, state, LookupState::Failed);
            LookupFailure { error, visible }
        };

        let record = match self.services.dictionary.find_by_unicode(code_point).await {
            Ok(record) => record,
            Err(e) => return Err(failed(&mut state, e.into(), Visible::Text(triggering))),
        };

        let Some(record) = record else {
            transition(&code, &mut state, LookupState::NoResult);
            let text = self.services.localizer.t(locale, NO_RESULT_KEY);
            return match self
                .services
                .messenger
                .edit_text(triggering, &text, TextFormat::Plain)
                .await
            {
                Ok(()) => Ok(LookupOutcome::NoResult),
                Err(e) => Err(failed(&mut state, e, Visible::Text(triggering))),
            };
        };

        transition(&code, &mut state, LookupState::Rendering);
        let caption = self.caption(locale, &record);

        let (artifact, placeholder) = tokio::join!(
            self.services.renderer.render(character),
            self.show_placeholder(triggering, &caption),
        );

        let placeholder = match (placeholder, &artifact) {
            (Ok(placeholder), _) => placeholder,
            (Err((e, visible)), artifact) => {
                if let Err(render_error) = artifact {
                    warn!(code = %code, error = %render_error, "render failed alongside placeholder");
                }
                return Err(failed(&mut state, e, visible));
            },
        };
        let artifact = match artifact {
            Ok(artifact) => artifact,
            Err(e) => return Err(failed(&mut state, e.into(), Visible::Caption(placeholder))),
        };

        if let Err(e) = self
            .services
            .messenger
            .edit_media(placeholder, &artifact, &caption)
            .await
        {
            return Err(failed(&mut state, e, Visible::Caption(placeholder)));
        }

        transition(&code, &mut state, LookupState::Done);
        Ok(LookupOutcome::Delivered { placeholder })
    }

    fn caption(&self, locale: &str, record: &DictionaryRecord) -> String {
        let params = Params::from_iter(record.fields());
        self.services
            .localizer
            .translate(locale, CAPTION_KEY, &params)
    }

    /// Delete `triggering` and send the placeholder. On failure, also
    /// returns what the user is left looking at.
    async fn show_placeholder(
        &self,
        triggering: MessageRef,
        caption: &str,
    ) -> Result<MessageRef, (Error, Visible)> {
        let messenger = &self.services.messenger;
        messenger
            .delete_message(triggering)
            .await
            .map_err(|e| (e, Visible::Text(triggering)))?;
        messenger
            .reply_with_photo(triggering.chat, self.placeholder_url, caption)
            .await
            .map_err(|e| (e, Visible::Nothing(triggering.chat)))
    }
}

fn transition(code: &str, state: &mut LookupState, next: LookupState) {
    debug!(code, from = %state, to = %next, "lookup state");
    *state = next;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::*,
        std::time::Duration,
    };

    const URL: &str = "https://example.test/loading.png";

    fn triggering() -> MessageRef {
        MessageRef::new(CHAT, 42)
    }

    async fn run(
        fixture: &Fixture,
        character: char,
    ) -> Result<LookupOutcome, LookupFailure> {
        LookupOrchestrator::new(&fixture.services, URL)
            .run(character, "en", triggering())
            .await
    }

    #[tokio::test]
    async fn miss_edits_triggering_message_once() {
        let fixture = Fixture::new();
        let outcome = run(&fixture, '中').await.unwrap();

        assert_eq!(outcome, LookupOutcome::NoResult);
        assert_eq!(fixture.messenger.calls(), vec![Call::EditText {
            message: triggering(),
            text: "en:search.no-result".into(),
            format: TextFormat::Plain,
        }]);
        assert_eq!(fixture.renderer.renders(), 0);
    }

    #[tokio::test]
    async fn hit_replaces_placeholder_with_render() {
        let fixture = Fixture::new().with_record(zhong());
        let outcome = run(&fixture, '中').await.unwrap();

        let calls = fixture.messenger.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Call::Delete {
            message: triggering()
        });
        let Call::Photo {
            chat,
            url,
            caption: placeholder_caption,
            sent,
        } = &calls[1]
        else {
            panic!("expected placeholder photo, got {:?}", calls[1]);
        };
        assert_eq!(*chat, CHAT);
        assert_eq!(url, URL);
        assert!(placeholder_caption.starts_with("en:search.riksdb{"));
        assert!(placeholder_caption.contains("code=U+4E2D"));
        assert!(placeholder_caption.contains("hangul=가운데 중"));
        assert!(placeholder_caption.contains("mandarin=-"));

        assert_eq!(calls[2], Call::EditMedia {
            message: *sent,
            file_name: "4E2D.png".into(),
            caption: placeholder_caption.clone(),
        });
        assert_eq!(outcome, LookupOutcome::Delivered { placeholder: *sent });
    }

    #[tokio::test]
    async fn dictionary_error_targets_triggering_message() {
        let fixture = Fixture::new().with_broken_dictionary();
        let failure = run(&fixture, '中').await.unwrap_err();

        assert_eq!(failure.visible, Visible::Text(triggering()));
        assert!(matches!(failure.error, Error::Dictionary(_)));
        assert!(fixture.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn render_error_targets_placeholder() {
        let fixture = Fixture::new().with_record(zhong()).with_broken_renderer();
        let failure = run(&fixture, '中').await.unwrap_err();

        let calls = fixture.messenger.calls();
        assert_eq!(calls.len(), 2);
        let Call::Photo { sent, .. } = &calls[1] else {
            panic!("expected placeholder photo");
        };
        assert_eq!(failure.visible, Visible::Caption(*sent));
        assert!(matches!(failure.error, Error::Render(_)));
    }

    #[tokio::test]
    async fn delete_failure_targets_triggering_message() {
        let fixture = Fixture::new()
            .with_record(zhong())
            .with_messenger(RecordingMessenger::failing_on(&["delete_message"]));
        let failure = run(&fixture, '中').await.unwrap_err();

        assert_eq!(failure.visible, Visible::Text(triggering()));
        assert_eq!(fixture.messenger.calls().len(), 1);
    }

    #[tokio::test]
    async fn placeholder_failure_after_delete_targets_chat() {
        let fixture = Fixture::new()
            .with_record(zhong())
            .with_messenger(RecordingMessenger::failing_on(&["reply_with_photo"]));
        let failure = run(&fixture, '中').await.unwrap_err();

        assert_eq!(failure.visible, Visible::Nothing(CHAT));
        assert_eq!(fixture.messenger.calls().len(), 2);
    }

    #[tokio::test]
    async fn render_runs_alongside_placeholder() {
        let gate = Rendezvous::default();
        let fixture = Fixture::new()
            .with_record(zhong())
            .with_messenger(RecordingMessenger::default().with_rendezvous(gate.clone()))
            .with_gated_renderer(gate);

        let outcome = tokio::time::timeout(Duration::from_secs(5), run(&fixture, '中'))
            .await
            .expect("render and placeholder must not wait on each other")
            .unwrap();

        assert!(matches!(outcome, LookupOutcome::Delivered { .. }));
        assert_eq!(fixture.renderer.renders(), 1);
    }

    #[tokio::test]
    async fn media_edit_failure_targets_placeholder() {
        let fixture = Fixture::new()
            .with_record(zhong())
            .with_messenger(RecordingMessenger::failing_on(&["edit_media"]));
        let failure = run(&fixture, '中').await.unwrap_err();

        let Visible::Caption(placeholder) = failure.visible else {
            panic!("expected placeholder target");
        };
        assert_ne!(placeholder, triggering());
    }

    #[tokio::test]
    async fn no_result_edit_failure_is_reported() {
        let fixture =
            Fixture::new().with_messenger(RecordingMessenger::failing_on(&["edit_text"]));
        let failure = run(&fixture, '中').await.unwrap_err();
        assert_eq!(failure.visible, Visible::Text(triggering()));
    }
}
