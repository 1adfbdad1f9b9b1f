//! Supported locales and per-sender locale overrides.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;

use crate::types::SenderId;

/// Locale used when nothing else is known about the sender.
pub const DEFAULT_LOCALE: &str = "en";

/// The six locales offered by the `/lang` keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocaleChoice {
    ZhCn,
    ZhHk,
    JaJp,
    KoKr,
    ZhTw,
    En,
}

impl LocaleChoice {
    /// Keyboard order.
    pub const ALL: [Self; 6] = [
        Self::ZhCn,
        Self::ZhHk,
        Self::JaJp,
        Self::KoKr,
        Self::ZhTw,
        Self::En,
    ];

    /// Two-letter code carried in the `lang_` callback payload.
    #[must_use]
    pub const fn region(self) -> &'static str {
        match self {
            Self::ZhCn => "cn",
            Self::ZhHk => "hk",
            Self::JaJp => "jp",
            Self::KoKr => "kr",
            Self::ZhTw => "tw",
            Self::En => "en",
        }
    }

    /// Catalog locale id stored for the sender.
    #[must_use]
    pub const fn locale_id(self) -> &'static str {
        match self {
            Self::ZhCn => "zh_CN",
            Self::ZhHk => "zh_HK",
            Self::JaJp => "ja_JP",
            Self::KoKr => "ko_KR",
            Self::ZhTw => "zh_TW",
            Self::En => DEFAULT_LOCALE,
        }
    }

    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::ZhCn => "🇨🇳",
            Self::ZhHk => "🇭🇰",
            Self::JaJp => "🇯🇵",
            Self::KoKr => "🇰🇷",
            Self::ZhTw => "🇹🇼",
            Self::En => "🇺🇸",
        }
    }

    /// Map a region code to a locale. Unknown codes mean English.
    #[must_use]
    pub fn from_region(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|choice| choice.region() == code)
            .unwrap_or(Self::En)
    }
}

/// Per-sender locale overrides chosen through `/lang`.
pub trait LocaleStore: Send + Sync {
    fn get(&self, sender: SenderId) -> Option<String>;
    fn set(&self, sender: SenderId, locale: &str);
}

struct LocaleEntry {
    locale: String,
    written: u64,
}

/// Bounded in-memory [`LocaleStore`]; past capacity the least recently
/// written override is forgotten.
pub struct MemoryLocaleStore {
    entries: RwLock<HashMap<SenderId, LocaleEntry>>,
    capacity: usize,
    writes: AtomicU64,
}

impl MemoryLocaleStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            writes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocaleStore for MemoryLocaleStore {
    fn get(&self, sender: SenderId) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&sender).map(|entry| entry.locale.clone())
    }

    fn set(&self, sender: SenderId, locale: &str) {
        let written = self.writes.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(sender, LocaleEntry {
            locale: locale.to_string(),
            written,
        });

        while entries.len() > self.capacity {
            let Some(oldest) = entries
                .iter()
                .filter(|(id, _)| **id != sender)
                .min_by_key(|(_, entry)| entry.written)
                .map(|(id, _)| *id)
            else {
                break;
            };
            entries.remove(&oldest);
            debug!(sender = %oldest, "evicted locale override");
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("cn", "zh_CN")]
    #[case("hk", "zh_HK")]
    #[case("jp", "ja_JP")]
    #[case("kr", "ko_KR")]
    #[case("tw", "zh_TW")]
    #[case("en", "en")]
    #[case("fr", "en")]
    #[case("KR", "en")]
    #[case("", "en")]
    fn region_table(#[case] code: &str, #[case] locale: &str) {
        assert_eq!(LocaleChoice::from_region(code).locale_id(), locale);
    }

    #[test]
    fn regions_are_unique() {
        let mut regions: Vec<_> = LocaleChoice::ALL.iter().map(|c| c.region()).collect();
        regions.sort_unstable();
        regions.dedup();
        assert_eq!(regions.len(), LocaleChoice::ALL.len());
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryLocaleStore::new(10);
        store.set(SenderId(7), "ja_JP");
        store.set(SenderId(7), "ko_KR");
        assert_eq!(store.get(SenderId(7)).as_deref(), Some("ko_KR"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_sender_has_no_override() {
        assert!(MemoryLocaleStore::new(10).get(SenderId(1)).is_none());
    }

    #[test]
    fn capacity_forgets_oldest_write() {
        let store = MemoryLocaleStore::new(2);
        store.set(SenderId(1), "zh_CN");
        store.set(SenderId(2), "zh_HK");
        store.set(SenderId(1), "zh_TW");
        store.set(SenderId(3), "ja_JP");

        assert!(store.get(SenderId(2)).is_none());
        assert_eq!(store.get(SenderId(1)).as_deref(), Some("zh_TW"));
        assert_eq!(store.get(SenderId(3)).as_deref(), Some("ja_JP"));
    }
}
