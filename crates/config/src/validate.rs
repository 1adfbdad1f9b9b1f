//! Configuration validation.
//!
//! Flags unknown or misspelled fields in the raw file and checks the parsed
//! config for values the bot cannot run with.

use std::{collections::HashMap, path::Path};

use url::Url;

use crate::{
    env_subst::substitute_env,
    loader::{self, ENV_BOT_TOKEN},
    schema::WhatHanziConfig,
};

/// Locales with a built-in catalog.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "zh_CN", "zh_HK", "zh_TW", "ja_JP", "ko_KR"];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "value", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.token"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn value(severity: Severity, path: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: "value",
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Expected shape of the configuration file.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let section = |keys: &[&'static str]| Struct(keys.iter().map(|k| (*k, Leaf)).collect());

    Struct(HashMap::from([
        (
            "bot",
            section(&["token", "answer_timeout", "poll_timeout_secs", "api_url"]),
        ),
        ("i18n", section(&["default_locale", "directory"])),
        ("dictionary", section(&["database_url"])),
        (
            "renderer",
            section(&["endpoint", "placeholder_url", "timeout_secs", "max_dimension"]),
        ),
        ("sessions", section(&["capacity", "idle_ttl_secs"])),
        ("locale_store", section(&["capacity"])),
    ]))
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (*candidate, levenshtein(needle, candidate)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(candidate, _)| candidate)
}

/// Validate a config file at the given path, or the discovered config file
/// when `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        let mut diagnostics = vec![Diagnostic {
            severity: Severity::Info,
            category: "file-ref",
            path: String::new(),
            message: "no config file found; using defaults".into(),
        }];
        let config = loader::apply_env_overrides(WhatHanziConfig::default()).unwrap_or_default();
        diagnostics.extend(check_config(&config));
        return ValidationResult {
            diagnostics,
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_str(&content, &actual_path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate raw config text. `path` only selects the format.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let raw = substitute_env(raw);

    let value = match loader::parse_config_value(&raw, path) {
        Ok(value) => value,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: e.to_string(),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<WhatHanziConfig>(value) {
        Ok(config) => match loader::apply_env_overrides(config) {
            Ok(config) => diagnostics.extend(check_config(&config)),
            Err(e) => diagnostics.push(Diagnostic::value(Severity::Error, "", e.to_string())),
        },
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on a parsed config (after environment overrides).
#[must_use]
pub fn check_config(config: &WhatHanziConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if !config.bot.has_token() {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "bot.token",
            format!("bot token is empty; set bot.token or {ENV_BOT_TOKEN}"),
        ));
    }
    if config.bot.poll_timeout_secs == 0 {
        diagnostics.push(Diagnostic::value(
            Severity::Warning,
            "bot.poll_timeout_secs",
            "0 disables long polling and makes the bot poll continuously",
        ));
    }
    if let Some(api_url) = &config.bot.api_url
        && Url::parse(api_url).is_err()
    {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "bot.api_url",
            format!("not a valid URL: {api_url}"),
        ));
    }

    let locale = config.i18n.default_locale.as_str();
    if !SUPPORTED_LOCALES.contains(&locale) {
        let message = match suggest(locale, SUPPORTED_LOCALES, 2) {
            Some(s) => format!("no built-in catalog for \"{locale}\" (did you mean \"{s}\"?)"),
            None => format!(
                "no built-in catalog for \"{locale}\"; supported: {}",
                SUPPORTED_LOCALES.join(", ")
            ),
        };
        diagnostics.push(Diagnostic::value(
            Severity::Warning,
            "i18n.default_locale",
            message,
        ));
    }
    if let Some(dir) = &config.i18n.directory
        && !dir.is_dir()
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "file-ref",
            path: "i18n.directory".into(),
            message: format!("catalog directory not found: {}", dir.display()),
        });
    }

    if config.dictionary.database_url.trim().is_empty() {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "dictionary.database_url",
            "database URL is empty",
        ));
    }

    let endpoint = config
        .renderer
        .endpoint
        .replace("{codepoint}", "4E2D")
        .replace("{char}", "%E4%B8%AD");
    if Url::parse(&endpoint).is_err() {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "renderer.endpoint",
            format!("not a valid URL template: {}", config.renderer.endpoint),
        ));
    } else if !config.renderer.endpoint.contains("{codepoint}")
        && !config.renderer.endpoint.contains("{char}")
    {
        diagnostics.push(Diagnostic::value(
            Severity::Warning,
            "renderer.endpoint",
            "no {codepoint} or {char} placeholder; the character is sent as ?character=",
        ));
    }
    if Url::parse(&config.renderer.placeholder_url).is_err() {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "renderer.placeholder_url",
            format!("not a valid URL: {}", config.renderer.placeholder_url),
        ));
    }
    if config.renderer.max_dimension == 0 {
        diagnostics.push(Diagnostic::value(
            Severity::Error,
            "renderer.max_dimension",
            "must be at least 1",
        ));
    }
    if config.renderer.timeout_secs == 0 {
        diagnostics.push(Diagnostic::value(
            Severity::Warning,
            "renderer.timeout_secs",
            "0 means every render request times out immediately",
        ));
    }

    for (path, capacity) in [
        ("sessions.capacity", config.sessions.capacity),
        ("locale_store.capacity", config.locale_store.capacity),
    ] {
        if capacity == 0 {
            diagnostics.push(Diagnostic::value(
                Severity::Warning,
                path,
                "0 is treated as 1",
            ));
        }
    }

    diagnostics
}

/// Walk the value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }

        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: message.trim().to_string(),
        });
    }
}
