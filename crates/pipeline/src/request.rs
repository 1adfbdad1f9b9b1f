//! Decoding of inbound events into requests.

use std::sync::LazyLock;

use regex::Regex;

use crate::{event::EventKind, locale::LocaleChoice};

/// Command that opens the locale keyboard.
pub const LOCALE_COMMAND: &str = "lang";

const LOCALE_PREFIX: &str = "lang_";
const LOOKUP_PREFIX: &str = "riks_";

#[allow(clippy::expect_used)]
static QUERY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:何字|무슨한자|(?i:what(?:hanzi|hanja|kanji)))\s+(.)$")
        .expect("query pattern is valid")
});

/// Everything the bot answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// "What character is X": offer the dictionaries.
    Query(char),
    /// `/lang`: offer the locale keyboard.
    ChangeLocale,
    SelectLocale(LocaleChoice),
    LookupGlyph(char),
}

impl Request {
    /// `None` for events the bot does not answer.
    #[must_use]
    pub fn decode(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Text { text } => parse_query(text).map(Self::Query),
            EventKind::Command { name, .. } => {
                (name == LOCALE_COMMAND).then_some(Self::ChangeLocale)
            },
            EventKind::Callback { data, .. } => Action::parse(data).map(|action| match action {
                Action::SetLocale(choice) => Self::SelectLocale(choice),
                Action::LookupGlyph(character) => Self::LookupGlyph(character),
            }),
        }
    }
}

fn parse_query(text: &str) -> Option<char> {
    QUERY_PATTERN
        .captures(text)?
        .get(1)?
        .as_str()
        .chars()
        .next()
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetLocale(LocaleChoice),
    LookupGlyph(char),
}

impl Action {
    /// `lang_` takes exactly two characters and `riks_` exactly one; anything
    /// else is not ours.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        if let Some(code) = payload.strip_prefix(LOCALE_PREFIX) {
            return (code.chars().count() == 2)
                .then(|| Self::SetLocale(LocaleChoice::from_region(code)));
        }
        if let Some(rest) = payload.strip_prefix(LOOKUP_PREFIX) {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(character), None) => Some(Self::LookupGlyph(character)),
                _ => None,
            };
        }
        None
    }

    #[must_use]
    pub fn encode(self) -> String {
        match self {
            Self::SetLocale(choice) => format!("{LOCALE_PREFIX}{}", choice.region()),
            Self::LookupGlyph(character) => format!("{LOOKUP_PREFIX}{character}"),
        }
    }
}
