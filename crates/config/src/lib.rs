//! Configuration loading, validation and env substitution.
//!
//! Config files: `whathanzi.toml`, `whathanzi.yaml`, `whathanzi.yml` or
//! `whathanzi.json`, searched in `./` then `~/.config/whathanzi/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw
//! file, and `WHATHANZI_*` environment overrides on top.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{LoadedConfig, apply_env_overrides, config_dir, find_config_file, load, load_config},
    schema::{
        BotConfig, DictionaryConfig, I18nConfig, LocaleStoreConfig, RendererConfig,
        SessionsConfig, WhatHanziConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, check_config, validate},
};
