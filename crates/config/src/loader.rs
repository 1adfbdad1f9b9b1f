use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::WhatHanziConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "whathanzi.toml",
    "whathanzi.yaml",
    "whathanzi.yml",
    "whathanzi.json",
];

pub const ENV_BOT_TOKEN: &str = "WHATHANZI_BOT_TOKEN";
pub const ENV_ANSWER_TIMEOUT: &str = "WHATHANZI_ANSWER_TIMEOUT";

/// A loaded config and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: WhatHanziConfig,
    pub path: Option<PathBuf>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<WhatHanziConfig> {
    let raw = read(path)?;
    parse_config(&substitute_env(&raw), path)
}

/// Load `explicit` if given, otherwise the first config file in the
/// standard locations, otherwise defaults. Environment overrides apply last.
///
/// Search order:
/// 1. `./whathanzi.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/whathanzi/whathanzi.{toml,yaml,yml,json}` (user-global)
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let config = match &path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => {
            debug!("no config file found, using defaults");
            WhatHanziConfig::default()
        },
    };

    Ok(LoadedConfig {
        config: apply_env_overrides(config)?,
        path,
    })
}

/// Find the first config file in standard locations.
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/whathanzi/`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "whathanzi").map(|d| d.config_dir().to_path_buf())
}

/// Apply `WHATHANZI_*` environment overrides.
pub fn apply_env_overrides(config: WhatHanziConfig) -> Result<WhatHanziConfig> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: WhatHanziConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<WhatHanziConfig> {
    if let Some(token) = lookup(ENV_BOT_TOKEN).filter(|v| !v.trim().is_empty()) {
        config.bot.token = Secret::new(token.trim().to_string());
    }
    if let Some(timeout) = lookup(ENV_ANSWER_TIMEOUT).filter(|v| !v.trim().is_empty()) {
        let secs = timeout
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::InvalidOverride {
                name: ENV_ANSWER_TIMEOUT,
                message: e.to_string(),
            })?;
        config.bot.answer_timeout = Some(secs);
    }
    Ok(config)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn format_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> Result<WhatHanziConfig> {
    let parse_error = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match format_of(path) {
        "toml" => toml::from_str(raw).map_err(|e| parse_error(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_error(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_error(e.to_string())),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

/// Parse raw config text into a JSON value tree, whatever the format.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    let parse_error = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match format_of(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(v).map_err(|e| parse_error(e.to_string()))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(v).map_err(|e| parse_error(e.to_string()))
        },
        "json" => serde_json::from_str(raw).map_err(|e| parse_error(e.to_string())),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
