//! Request handling for the character lookup bot.
//!
//! An inbound event flows through the [`normalizer`] (session, staleness,
//! locale), is decoded into a [`request::Request`] and handled by the
//! [`dispatcher`]. Glyph selections run the two-stage reply in
//! [`orchestrator`]; its failures are shown to the user by [`translate`].
//!
//! Transport, localization, dictionary and rendering are reached only
//! through traits so the pipeline can be driven by test doubles.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod locale;
pub mod messenger;
pub mod normalizer;
pub mod orchestrator;
pub mod pipeline;
pub mod request;
pub mod session;
pub mod translate;
pub mod types;

#[cfg(test)]
mod test_support;

pub use {
    error::{Error, Result},
    event::{EventKind, InboundEvent},
    locale::{LocaleChoice, LocaleStore, MemoryLocaleStore},
    messenger::{InlineButton, Messenger, OutgoingText, TextFormat},
    pipeline::{Pipeline, PipelineSettings, Services},
    session::{Session, SessionPolicy, SessionStore},
    types::{ChatId, MessageRef, SenderId},
};
