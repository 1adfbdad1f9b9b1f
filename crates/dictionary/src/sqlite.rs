use std::str::FromStr;

use {
    async_trait::async_trait,
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
    tracing::debug,
};

use crate::{
    DictionaryStore,
    error::{Error, Result},
    record::DictionaryRecord,
};

#[derive(sqlx::FromRow)]
struct RecordRow {
    unicode: i64,
    character: String,
    hangul: Option<String>,
    meaning: Option<String>,
    radical: Option<String>,
    strokes: Option<i64>,
    mandarin: Option<String>,
    cantonese: Option<String>,
    japanese_on: Option<String>,
    japanese_kun: Option<String>,
}

impl TryFrom<RecordRow> for DictionaryRecord {
    type Error = Error;

    fn try_from(r: RecordRow) -> Result<Self> {
        let code_point = u32::try_from(r.unicode).map_err(|_| Error::InvalidRecord {
            code_point: 0,
            message: format!("unicode column out of range: {}", r.unicode),
        })?;
        let strokes = r
            .strokes
            .map(u32::try_from)
            .transpose()
            .map_err(|_| Error::InvalidRecord {
                code_point,
                message: "negative stroke count".into(),
            })?;
        Ok(Self {
            unicode: code_point,
            character: r.character,
            hangul: r.hangul,
            meaning: r.meaning,
            radical: r.radical,
            strokes,
            mandarin: r.mandarin,
            cantonese: r.cantonese,
            japanese_on: r.japanese_on,
            japanese_kun: r.japanese_kun,
        })
    }
}

/// SQLite-backed dictionary (`riksdb` table keyed by code point).
pub struct SqliteDictionary {
    pool: SqlitePool,
}

impl SqliteDictionary {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open `database_url` read-only, the way the bot uses it.
    pub async fn connect_read_only(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Open `database_url` for writing, creating the file and schema if needed.
    pub async fn connect_writable(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::init(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Create the `riksdb` table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS riksdb (
                unicode      INTEGER PRIMARY KEY,
                character    TEXT    NOT NULL,
                hangul       TEXT,
                meaning      TEXT,
                radical      TEXT,
                strokes      INTEGER,
                mandarin     TEXT,
                cantonese    TEXT,
                japanese_on  TEXT,
                japanese_kun TEXT
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a batch of records in one transaction.
    pub async fn upsert_all(&self, records: &[DictionaryRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for record in records {
            written += sqlx::query(
                "INSERT OR REPLACE INTO riksdb
                 (unicode, character, hangul, meaning, radical, strokes,
                  mandarin, cantonese, japanese_on, japanese_kun)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(i64::from(record.unicode))
            .bind(&record.character)
            .bind(&record.hangul)
            .bind(&record.meaning)
            .bind(&record.radical)
            .bind(record.strokes.map(i64::from))
            .bind(&record.mandarin)
            .bind(&record.cantonese)
            .bind(&record.japanese_on)
            .bind(&record.japanese_kun)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }
}

#[async_trait]
impl DictionaryStore for SqliteDictionary {
    async fn find_by_unicode(&self, code_point: u32) -> Result<Option<DictionaryRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT unicode, character, hangul, meaning, radical, strokes,
                    mandarin, cantonese, japanese_on, japanese_kun
             FROM riksdb
             WHERE unicode = ?",
        )
        .bind(i64::from(code_point))
        .fetch_optional(&self.pool)
        .await?;

        debug!(code_point, found = row.is_some(), "dictionary lookup");
        row.map(DictionaryRecord::try_from).transpose()
    }
}
