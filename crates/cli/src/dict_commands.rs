use std::path::{Path, PathBuf};

use {
    anyhow::{Context, bail},
    clap::Subcommand,
    tracing::info,
    whathanzi_dictionary::{DictionaryRecord, DictionaryStore, SqliteDictionary},
};

#[derive(Subcommand)]
pub enum DictAction {
    /// Load records from a JSON array into the dictionary database.
    Import {
        /// JSON file holding an array of records.
        file: PathBuf,
        /// Database URL (overrides `dictionary.database_url`).
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Print the entry for a single character.
    Lookup {
        character: char,
        /// Database URL (overrides `dictionary.database_url`).
        #[arg(long)]
        database_url: Option<String>,
    },
}

pub async fn handle_dict(action: DictAction, config_path: Option<&Path>) -> anyhow::Result<()> {
    match action {
        DictAction::Import { file, database_url } => {
            let url = resolve_database_url(database_url, config_path)?;
            import(&file, &url).await
        },
        DictAction::Lookup {
            character,
            database_url,
        } => {
            let url = resolve_database_url(database_url, config_path)?;
            lookup(character, &url).await
        },
    }
}

fn resolve_database_url(
    explicit: Option<String>,
    config_path: Option<&Path>,
) -> anyhow::Result<String> {
    match explicit {
        Some(url) => Ok(url),
        None => Ok(whathanzi_config::load(config_path)?
            .config
            .dictionary
            .database_url),
    }
}

async fn import(file: &Path, database_url: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let records = parse_records(&raw)?;

    let dictionary = SqliteDictionary::connect_writable(database_url)
        .await
        .with_context(|| format!("failed to open {database_url}"))?;
    let written = dictionary.upsert_all(&records).await?;

    info!(records = records.len(), written, database_url, "dictionary import finished");
    println!("Imported {} record(s) into {database_url}.", records.len());
    Ok(())
}

/// Parse and sanity-check a JSON array of records.
fn parse_records(raw: &str) -> anyhow::Result<Vec<DictionaryRecord>> {
    let records: Vec<DictionaryRecord> =
        serde_json::from_str(raw).context("expected a JSON array of dictionary records")?;

    for (index, record) in records.iter().enumerate() {
        let mut chars = record.character.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            bail!(
                "record {index}: character must be exactly one character, got {:?}",
                record.character
            );
        };
        if u32::from(c) != record.unicode {
            bail!(
                "record {index}: unicode {:X} does not match character {c} ({:X})",
                record.unicode,
                u32::from(c)
            );
        }
    }
    Ok(records)
}

async fn lookup(character: char, database_url: &str) -> anyhow::Result<()> {
    let dictionary = SqliteDictionary::connect_read_only(database_url)
        .await
        .with_context(|| format!("failed to open {database_url}"))?;

    match dictionary.find_by_unicode(u32::from(character)).await? {
        Some(record) => {
            for (name, value) in record.fields() {
                println!("{name:<13} {value}");
            }
        },
        None => println!("No entry for {character}."),
    }
    Ok(())
}
