use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, Utc},
    tracing::{debug, error},
    whathanzi_dictionary::DictionaryStore,
    whathanzi_glyph::GlyphRenderer,
    whathanzi_i18n::Localizer,
};

use crate::{
    dispatcher::Dispatcher,
    event::InboundEvent,
    locale::{DEFAULT_LOCALE, LocaleStore},
    messenger::Messenger,
    normalizer::Normalizer,
    session::{SessionPolicy, SessionStore},
};

/// Placeholder shown while a glyph renders.
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://i.ibb.co/9TCF0WZ/loading.png";

/// Collaborators the pipeline talks to.
#[derive(Clone)]
pub struct Services {
    pub messenger: Arc<dyn Messenger>,
    pub localizer: Arc<dyn Localizer>,
    pub dictionary: Arc<dyn DictionaryStore>,
    pub renderer: Arc<dyn GlyphRenderer>,
    pub locales: Arc<dyn LocaleStore>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Events older than this are dropped. `None` or zero disables the check.
    pub answer_timeout: Option<Duration>,
    pub default_locale: String,
    pub placeholder_url: String,
    pub session_policy: SessionPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            answer_timeout: None,
            default_locale: DEFAULT_LOCALE.to_string(),
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            session_policy: SessionPolicy::default(),
        }
    }
}

/// Entry point for inbound events: normalize, then dispatch.
///
/// Cheap to share behind an `Arc`; every event is handled independently.
pub struct Pipeline {
    services: Services,
    sessions: Arc<SessionStore>,
    normalizer: Normalizer,
    placeholder_url: String,
}

impl Pipeline {
    #[must_use]
    pub fn new(services: Services, settings: PipelineSettings) -> Self {
        let sessions = Arc::new(SessionStore::new(settings.session_policy));
        let normalizer = Normalizer::standard(
            Arc::clone(&sessions),
            Arc::clone(&services.locales),
            settings.answer_timeout,
            &settings.default_locale,
        );
        Self {
            services,
            sessions,
            normalizer,
            placeholder_url: settings.placeholder_url,
        }
    }

    /// Handle one event. Failures are logged, never returned.
    pub async fn handle(&self, event: InboundEvent) {
        self.handle_at(event, Utc::now()).await;
    }

    /// [`Pipeline::handle`] with an explicit clock.
    pub async fn handle_at(&self, event: InboundEvent, now: DateTime<Utc>) {
        let sender = event.sender;
        let Some(normalized) = self.normalizer.normalize(event, now) else {
            return;
        };

        let dispatcher = Dispatcher::new(&self.services, &self.placeholder_url);
        if let Err(e) = dispatcher.dispatch(&normalized).await {
            error!(sender = %sender, error = %e, "failed to handle event");
        }
    }

    /// Drop idle sessions. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.sessions.evict_idle(now);
        if evicted > 0 {
            debug!(evicted, remaining = self.sessions.len(), "swept idle sessions");
        }
        evicted
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
