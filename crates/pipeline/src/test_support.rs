//! Test doubles shared by the pipeline's unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicI32, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    tokio::sync::Notify,
    whathanzi_dictionary::{DictionaryRecord, DictionaryStore},
    whathanzi_glyph::{GlyphRenderer, RenderArtifact},
    whathanzi_i18n::{Localizer, Params},
};

use crate::{
    error::{Error, Result},
    event::{EventKind, InboundEvent},
    locale::MemoryLocaleStore,
    messenger::{Messenger, OutgoingText, TextFormat},
    pipeline::Services,
    types::{ChatId, MessageRef, SenderId},
};

pub const SENDER: SenderId = SenderId(7);
pub const CHAT: ChatId = ChatId(-1001);

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn event(kind: EventKind) -> InboundEvent {
    InboundEvent {
        sender: SENDER,
        chat: CHAT,
        kind,
        sent_at: None,
        client_locale: None,
    }
}

pub fn text_event(text: &str) -> InboundEvent {
    event(EventKind::Text { text: text.into() })
}

pub fn command_event(name: &str) -> InboundEvent {
    event(EventKind::Command {
        name: name.into(),
        args: String::new(),
    })
}

pub fn callback_event(data: &str, message: Option<MessageRef>) -> InboundEvent {
    event(EventKind::Callback {
        data: data.into(),
        message,
    })
}

pub fn triggering_message_ref() -> MessageRef {
    MessageRef::new(CHAT, 500)
}

pub trait EventExt {
    fn sent(self, at: DateTime<Utc>) -> Self;
    fn client_locale(self, locale: &str) -> Self;
}

impl EventExt for InboundEvent {
    fn sent(mut self, at: DateTime<Utc>) -> Self {
        self.sent_at = Some(at);
        self
    }

    fn client_locale(mut self, locale: &str) -> Self {
        self.client_locale = Some(locale.into());
        self
    }
}

pub fn zhong() -> DictionaryRecord {
    let mut record = DictionaryRecord::new('中');
    record.hangul = Some("가운데 중".into());
    record.meaning = Some("middle, center".into());
    record.radical = Some("丨".into());
    record.strokes = Some(4);
    record
}

/// Messenger calls in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reply {
        chat: ChatId,
        message: OutgoingText,
        sent: MessageRef,
    },
    EditText {
        message: MessageRef,
        text: String,
        format: TextFormat,
    },
    EditCaption {
        message: MessageRef,
        caption: String,
        format: TextFormat,
    },
    EditMedia {
        message: MessageRef,
        file_name: String,
        caption: String,
    },
    Delete {
        message: MessageRef,
    },
    Photo {
        chat: ChatId,
        url: String,
        caption: String,
        sent: MessageRef,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{0} rejected by test transport")]
pub struct Rejected(&'static str);

/// Meeting point for a gated renderer and the placeholder photo. Each side
/// waits for the other, so they only finish when run concurrently.
#[derive(Clone, Default)]
pub struct Rendezvous {
    render_started: Arc<Notify>,
    photo_requested: Arc<Notify>,
}

impl Rendezvous {
    async fn render_side(&self) {
        self.render_started.notify_one();
        self.photo_requested.notified().await;
    }

    async fn photo_side(&self) {
        self.render_started.notified().await;
        self.photo_requested.notify_one();
    }
}

/// Records every call; operations named in `failing` return an error after
/// being recorded.
pub struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    failing: Vec<&'static str>,
    photo_gate: Option<Rendezvous>,
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::failing_on(&[])
    }
}

impl RecordingMessenger {
    pub fn failing_on(operations: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1000),
            failing: operations.to_vec(),
            photo_gate: None,
        }
    }

    /// `reply_with_photo` waits until a gated render has started.
    pub fn with_rendezvous(mut self, gate: Rendezvous) -> Self {
        self.photo_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(&operation) {
            return Err(Error::transport(operation, Rejected(operation)));
        }
        Ok(())
    }

    fn next_message(&self, chat: ChatId) -> MessageRef {
        MessageRef::new(chat, self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, chat: ChatId, message: OutgoingText) -> Result<MessageRef> {
        let sent = self.next_message(chat);
        self.record("reply", Call::Reply {
            chat,
            message,
            sent,
        })?;
        Ok(sent)
    }

    async fn edit_text(&self, message: MessageRef, text: &str, format: TextFormat) -> Result<()> {
        self.record("edit_text", Call::EditText {
            message,
            text: text.into(),
            format,
        })
    }

    async fn edit_caption(
        &self,
        message: MessageRef,
        caption: &str,
        format: TextFormat,
    ) -> Result<()> {
        self.record("edit_caption", Call::EditCaption {
            message,
            caption: caption.into(),
            format,
        })
    }

    async fn edit_media(
        &self,
        message: MessageRef,
        artifact: &RenderArtifact,
        caption: &str,
    ) -> Result<()> {
        self.record("edit_media", Call::EditMedia {
            message,
            file_name: artifact.file_name.clone(),
            caption: caption.into(),
        })
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.record("delete_message", Call::Delete { message })
    }

    async fn reply_with_photo(
        &self,
        chat: ChatId,
        url: &str,
        caption: &str,
    ) -> Result<MessageRef> {
        if let Some(gate) = &self.photo_gate {
            gate.photo_side().await;
        }
        let sent = self.next_message(chat);
        self.record("reply_with_photo", Call::Photo {
            chat,
            url: url.into(),
            caption: caption.into(),
            sent,
        })?;
        Ok(sent)
    }
}

/// Renders `locale:key{name=value,...}` so tests can see what was asked for.
pub struct EchoLocalizer;

impl Localizer for EchoLocalizer {
    fn translate(&self, locale: &str, key: &str, params: &Params) -> String {
        if params.is_empty() {
            return format!("{locale}:{key}");
        }
        let params: Vec<_> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{locale}:{key}{{{}}}", params.join(","))
    }
}

pub struct FakeDictionary {
    records: HashMap<u32, DictionaryRecord>,
    broken: bool,
}

#[async_trait]
impl DictionaryStore for FakeDictionary {
    async fn find_by_unicode(
        &self,
        code_point: u32,
    ) -> whathanzi_dictionary::Result<Option<DictionaryRecord>> {
        if self.broken {
            return Err(whathanzi_dictionary::Error::InvalidRecord {
                code_point,
                message: "dictionary unavailable".into(),
            });
        }
        Ok(self.records.get(&code_point).cloned())
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    broken: bool,
    renders: AtomicUsize,
    gate: Option<Rendezvous>,
}

impl FakeRenderer {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GlyphRenderer for FakeRenderer {
    async fn render(&self, character: char) -> whathanzi_glyph::Result<RenderArtifact> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.render_side().await;
        }
        if self.broken {
            return Err(whathanzi_glyph::Error::Status {
                character,
                status: 502,
            });
        }
        Ok(RenderArtifact {
            data: vec![0x89, b'P', b'N', b'G'],
            media_type: "image/png".into(),
            file_name: format!("{:04X}.png", u32::from(character)),
        })
    }
}

/// Services wired to test doubles, plus handles to inspect them.
pub struct Fixture {
    pub services: Services,
    pub messenger: Arc<RecordingMessenger>,
    pub renderer: Arc<FakeRenderer>,
    pub locales: Arc<MemoryLocaleStore>,
    records: Vec<DictionaryRecord>,
    dictionary_broken: bool,
}

impl Fixture {
    pub fn new() -> Self {
        let messenger = Arc::new(RecordingMessenger::default());
        let renderer = Arc::new(FakeRenderer::default());
        let locales = Arc::new(MemoryLocaleStore::new(100));
        let services = Services {
            messenger: messenger.clone(),
            localizer: Arc::new(EchoLocalizer),
            dictionary: Arc::new(FakeDictionary {
                records: HashMap::new(),
                broken: false,
            }),
            renderer: renderer.clone(),
            locales: locales.clone(),
        };
        Self {
            services,
            messenger,
            renderer,
            locales,
            records: Vec::new(),
            dictionary_broken: false,
        }
    }

    pub fn with_record(mut self, record: DictionaryRecord) -> Self {
        self.records.push(record);
        self.rebuild_dictionary()
    }

    pub fn with_broken_dictionary(mut self) -> Self {
        self.dictionary_broken = true;
        self.rebuild_dictionary()
    }

    pub fn with_broken_renderer(mut self) -> Self {
        self.renderer = Arc::new(FakeRenderer {
            broken: true,
            ..FakeRenderer::default()
        });
        self.services.renderer = self.renderer.clone();
        self
    }

    /// Renderer that only finishes once the placeholder photo is requested.
    pub fn with_gated_renderer(mut self, gate: Rendezvous) -> Self {
        self.renderer = Arc::new(FakeRenderer {
            gate: Some(gate),
            ..FakeRenderer::default()
        });
        self.services.renderer = self.renderer.clone();
        self
    }

    pub fn with_messenger(mut self, messenger: RecordingMessenger) -> Self {
        self.messenger = Arc::new(messenger);
        self.services.messenger = self.messenger.clone();
        self
    }

    fn rebuild_dictionary(mut self) -> Self {
        self.services.dictionary = Arc::new(FakeDictionary {
            records: self
                .records
                .iter()
                .map(|record| (record.unicode, record.clone()))
                .collect(),
            broken: self.dictionary_broken,
        });
        self
    }
}
