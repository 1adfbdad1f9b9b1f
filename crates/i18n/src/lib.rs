//! Localized message catalogs for the bot.
//!
//! Catalogs are YAML documents keyed by locale id (`en`, `ko_KR`, ...). Nested
//! keys are flattened to dotted paths (`search.no-result`) and values may
//! reference parameters as `${name}`.

pub mod catalog;
pub mod error;
pub mod template;

use std::collections::BTreeMap;

pub use {
    catalog::Catalog,
    error::{Error, Result},
};

/// Named values interpolated into a message template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Looks up and formats user-facing strings.
///
/// Implementations never fail: a missing key falls back to the default
/// locale and finally to the key itself.
pub trait Localizer: Send + Sync {
    fn translate(&self, locale: &str, key: &str, params: &Params) -> String;

    fn t(&self, locale: &str, key: &str) -> String {
        self.translate(locale, key, &Params::new())
    }
}
