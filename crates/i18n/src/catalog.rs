use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use {
    serde_yaml::Value,
    tracing::{debug, warn},
};

use crate::{
    Localizer, Params,
    error::{Error, Result},
    template::interpolate,
};

/// Catalogs compiled into the binary, one per supported locale.
const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/en.yaml"))),
    ("ja_JP", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/ja_JP.yaml"))),
    ("ko_KR", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/ko_KR.yaml"))),
    ("zh_CN", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/zh_CN.yaml"))),
    ("zh_HK", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/zh_HK.yaml"))),
    ("zh_TW", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/locales/zh_TW.yaml"))),
];

const CATALOG_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// In-memory message catalog with locale fallback.
///
/// Lookup order for a requested locale:
/// 1. the locale itself (`ko-kr` and `ko_KR` are the same locale),
/// 2. the first loaded locale sharing its language (`ko` finds `ko_KR`),
/// 3. the default locale,
/// 4. the key itself.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_locale: String,
    // BTreeMap keeps language-prefix fallback deterministic.
    messages: BTreeMap<String, HashMap<String, String>>,
}

impl Catalog {
    pub fn new(default_locale: &str) -> Self {
        Self {
            default_locale: normalize_locale(default_locale),
            messages: BTreeMap::new(),
        }
    }

    /// Catalog preloaded with the bundled translations.
    pub fn embedded(default_locale: &str) -> Result<Self> {
        let mut catalog = Self::new(default_locale);
        for (locale, raw) in EMBEDDED {
            catalog.insert_yaml(locale, raw)?;
        }
        Ok(catalog)
    }

    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// Merge a YAML document into `locale`, overriding existing keys.
    pub fn insert_yaml(&mut self, locale: &str, raw: &str) -> Result<()> {
        let value: Value =
            serde_yaml::from_str(raw).map_err(|e| Error::invalid_catalog(locale, e))?;
        self.merge(locale, &value)
    }

    /// Merge a JSON document into `locale`, overriding existing keys.
    pub fn insert_json(&mut self, locale: &str, raw: &str) -> Result<()> {
        let json: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| Error::invalid_catalog(locale, e))?;
        let value = serde_yaml::to_value(json).map_err(|e| Error::invalid_catalog(locale, e))?;
        self.merge(locale, &value)
    }

    fn merge(&mut self, locale: &str, value: &Value) -> Result<()> {
        let mut flat = HashMap::new();
        flatten("", value, &mut flat);
        if flat.is_empty() && !value.is_null() {
            return Err(Error::invalid_catalog(locale, "expected a mapping of keys"));
        }
        self.messages
            .entry(normalize_locale(locale))
            .or_default()
            .extend(flat);
        Ok(())
    }

    /// Overlay every `<locale>.{yaml,yml,json}` file found in `dir`.
    ///
    /// Returns the number of files loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !CATALOG_EXTENSIONS.contains(&ext) {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            if ext == "json" {
                self.insert_json(locale, &raw)?;
            } else {
                self.insert_yaml(locale, &raw)?;
            }
            debug!(path = %path.display(), locale, "loaded locale catalog");
            loaded += 1;
        }
        Ok(loaded)
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        let requested = normalize_locale(locale);
        let language = requested.split('_').next().unwrap_or_default();

        let exact = self.messages.get(&requested);
        let same_language = self
            .messages
            .iter()
            .find(|(id, _)| id.split('_').next() == Some(language))
            .map(|(_, messages)| messages);
        let fallback = self.messages.get(&self.default_locale);

        [exact, same_language, fallback]
            .into_iter()
            .flatten()
            .find_map(|messages| messages.get(key))
            .map(String::as_str)
    }
}

impl Localizer for Catalog {
    fn translate(&self, locale: &str, key: &str, params: &Params) -> String {
        match self.lookup(locale, key) {
            Some(template) => interpolate(template, params),
            None => {
                warn!(locale, key, "missing translation");
                key.to_string()
            },
        }
    }
}

/// Canonical form of a locale id: `ko-kr` → `ko_KR`, `EN` → `en`.
#[must_use]
pub fn normalize_locale(locale: &str) -> String {
    let mut parts = locale.trim().split(['-', '_']);
    let language = parts.next().unwrap_or_default().to_ascii_lowercase();
    match parts.next() {
        Some(region) if !region.is_empty() => format!("{language}_{}", region.to_ascii_uppercase()),
        _ => language,
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    let scalar = match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(k) = scalar_to_string(k) else {
                    continue;
                };
                let key = if prefix.is_empty() {
                    k
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
            return;
        },
        other => scalar_to_string(other),
    };
    if let Some(text) = scalar
        && !prefix.is_empty()
    {
        out.insert(prefix.to_string(), text);
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
