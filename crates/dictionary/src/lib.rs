//! Character dictionary lookups.
//!
//! The bot only needs [`DictionaryStore::find_by_unicode`]; the SQLite
//! adapter additionally exposes schema setup and record import for tooling.

pub mod error;
pub mod record;
pub mod sqlite;

use async_trait::async_trait;

pub use {
    error::{Error, Result},
    record::{DictionaryRecord, format_code_point},
    sqlite::SqliteDictionary,
};

/// Read access to a character dictionary.
#[async_trait]
pub trait DictionaryStore: Send + Sync {
    /// Entry for `code_point`, or `None` when the dictionary has no such character.
    async fn find_by_unicode(&self, code_point: u32) -> Result<Option<DictionaryRecord>>;
}
