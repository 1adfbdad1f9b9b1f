//! Inbound event normalization.
//!
//! A [`Normalizer`] runs an ordered list of [`NormalizeStep`]s over each
//! event. Steps run synchronously and the first [`Flow::Drop`] ends the
//! chain; the event then gets no reply at all.

use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, TimeDelta, Utc},
    tracing::debug,
};

use crate::{
    event::InboundEvent,
    locale::LocaleStore,
    session::{Session, SessionStore},
};

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Stale { delay_secs: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Drop(DropReason),
}

/// State threaded through the steps for one event.
pub struct StepContext<'a> {
    pub event: &'a InboundEvent,
    pub now: DateTime<Utc>,
    pub session: Option<Session>,
    pub locale: Option<String>,
}

pub trait NormalizeStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, ctx: &mut StepContext<'_>) -> Flow;
}

/// Event with session and effective locale resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub event: InboundEvent,
    pub session: Session,
    pub locale: String,
}

pub struct Normalizer {
    steps: Vec<Box<dyn NormalizeStep>>,
    default_locale: String,
}

impl Normalizer {
    #[must_use]
    pub fn new(steps: Vec<Box<dyn NormalizeStep>>, default_locale: impl Into<String>) -> Self {
        Self {
            steps,
            default_locale: default_locale.into(),
        }
    }

    /// Session attachment, then the staleness filter, then locale resolution.
    #[must_use]
    pub fn standard(
        sessions: Arc<SessionStore>,
        locales: Arc<dyn LocaleStore>,
        answer_timeout: Option<Duration>,
        default_locale: &str,
    ) -> Self {
        Self::new(
            vec![
                Box::new(AttachSession { sessions }),
                Box::new(DropStale {
                    max_delay: answer_timeout,
                }),
                Box::new(ResolveLocale {
                    locales,
                    default_locale: default_locale.to_string(),
                }),
            ],
            default_locale,
        )
    }

    /// Run every step over `event`; `None` means the event was dropped.
    pub fn normalize(&self, event: InboundEvent, now: DateTime<Utc>) -> Option<NormalizedEvent> {
        let mut ctx = StepContext {
            event: &event,
            now,
            session: None,
            locale: None,
        };

        for step in &self.steps {
            if let Flow::Drop(reason) = step.apply(&mut ctx) {
                debug!(
                    step = step.name(),
                    sender = %event.sender,
                    ?reason,
                    "event dropped"
                );
                return None;
            }
        }

        let StepContext {
            session, locale, ..
        } = ctx;
        let session = session.unwrap_or_else(|| Session::new(event.sender, now));
        let locale = locale.unwrap_or_else(|| self.default_locale.clone());
        Some(NormalizedEvent {
            event,
            session,
            locale,
        })
    }
}

/// Creates or refreshes the sender's session.
pub struct AttachSession {
    pub sessions: Arc<SessionStore>,
}

impl NormalizeStep for AttachSession {
    fn name(&self) -> &'static str {
        "attach_session"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Flow {
        ctx.session = Some(self.sessions.touch(ctx.event.sender, ctx.now));
        Flow::Continue
    }
}

/// Drops events older than `max_delay`. Disabled when `None` or zero, and
/// never applies to events without a timestamp.
pub struct DropStale {
    pub max_delay: Option<Duration>,
}

impl NormalizeStep for DropStale {
    fn name(&self) -> &'static str {
        "drop_stale"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Flow {
        let Some(max_delay) = self.max_delay.filter(|d| !d.is_zero()) else {
            return Flow::Continue;
        };
        let Some(sent_at) = ctx.event.sent_at else {
            return Flow::Continue;
        };
        let Ok(max_delay) = TimeDelta::from_std(max_delay) else {
            return Flow::Continue;
        };

        let delay = ctx.now.signed_duration_since(sent_at);
        if delay > max_delay {
            Flow::Drop(DropReason::Stale {
                delay_secs: delay.num_seconds(),
            })
        } else {
            Flow::Continue
        }
    }
}

/// `override ?? client locale ?? default`.
pub struct ResolveLocale {
    pub locales: Arc<dyn LocaleStore>,
    pub default_locale: String,
}

impl NormalizeStep for ResolveLocale {
    fn name(&self) -> &'static str {
        "resolve_locale"
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Flow {
        let locale = self
            .locales
            .get(ctx.event.sender)
            .or_else(|| {
                ctx.event
                    .client_locale
                    .clone()
                    .filter(|l| !l.trim().is_empty())
            })
            .unwrap_or_else(|| self.default_locale.clone());
        ctx.locale = Some(locale);
        Flow::Continue
    }
}
