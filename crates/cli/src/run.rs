use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, bail},
    chrono::Utc,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    whathanzi_config::{
        I18nConfig, LoadedConfig, WhatHanziConfig,
        validate::{Severity, check_config},
    },
    whathanzi_dictionary::SqliteDictionary,
    whathanzi_glyph::HttpGlyphRenderer,
    whathanzi_i18n::{Catalog, Localizer},
    whathanzi_pipeline::{
        MemoryLocaleStore, Pipeline, PipelineSettings, Services, SessionPolicy,
    },
    whathanzi_telegram::{TelegramConfig, TelegramMessenger},
};

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Start the bot and run until Ctrl-C or until polling stops on its own.
pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let LoadedConfig { config, path } = whathanzi_config::load(config_path)?;
    match &path {
        Some(path) => info!(path = %path.display(), "loaded config"),
        None => info!("no config file found, using defaults"),
    }
    ensure_runnable(&config)?;

    let catalog = Arc::new(build_catalog(&config.i18n)?);
    let dictionary = SqliteDictionary::connect_read_only(&config.dictionary.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.dictionary.database_url))?;
    let renderer = HttpGlyphRenderer::new(
        config.renderer.endpoint.clone(),
        config.renderer.timeout(),
        config.renderer.max_dimension,
    )?;

    let telegram = TelegramConfig {
        token: config.bot.token.clone(),
        poll_timeout_secs: config.bot.poll_timeout_secs,
        api_url: config.bot.api_url.clone(),
    };
    let command_description = catalog.t(&config.i18n.default_locale, "lang.command");
    let handle = whathanzi_telegram::connect(&telegram, &command_description).await?;

    let services = Services {
        messenger: Arc::new(TelegramMessenger::new(handle.bot.clone())),
        localizer: catalog,
        dictionary: Arc::new(dictionary),
        renderer: Arc::new(renderer),
        locales: Arc::new(MemoryLocaleStore::new(config.locale_store.capacity)),
    };
    let pipeline = Arc::new(Pipeline::new(services, pipeline_settings(&config)));

    let cancel = CancellationToken::new();
    let poller = whathanzi_telegram::start_polling(
        handle,
        Arc::clone(&pipeline),
        telegram.poll_timeout_secs,
        cancel.clone(),
    );
    let sweeper = spawn_sweeper(Arc::clone(&pipeline), cancel.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {
            warn!("polling stopped, shutting down");
        },
    }
    cancel.cancel();

    if let Err(e) = poller.await {
        warn!(error = %e, "polling task ended abnormally");
    }
    if let Err(e) = sweeper.await {
        warn!(error = %e, "session sweeper ended abnormally");
    }
    info!("whathanzi stopped");
    Ok(())
}

/// Log every diagnostic and refuse to start on errors.
fn ensure_runnable(config: &WhatHanziConfig) -> anyhow::Result<()> {
    let diagnostics = check_config(config);
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("invalid configuration ({errors} error(s)); run `whathanzi config check`");
    }
    Ok(())
}

/// Embedded catalogs, overlaid with the configured directory if any.
fn build_catalog(config: &I18nConfig) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::embedded(&config.default_locale)?;
    if let Some(dir) = &config.directory {
        let loaded = catalog
            .load_dir(dir)
            .with_context(|| format!("failed to load catalogs from {}", dir.display()))?;
        info!(directory = %dir.display(), loaded, "loaded catalog overlay");
    }
    Ok(catalog)
}

fn pipeline_settings(config: &WhatHanziConfig) -> PipelineSettings {
    PipelineSettings {
        answer_timeout: config.bot.answer_timeout(),
        default_locale: config.i18n.default_locale.clone(),
        placeholder_url: config.renderer.placeholder_url.clone(),
        session_policy: SessionPolicy {
            capacity: config.sessions.capacity.max(1),
            idle_ttl: config.sessions.idle_ttl(),
        },
    }
}

fn spawn_sweeper(pipeline: Arc<Pipeline>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    pipeline.sweep(Utc::now());
                },
            }
        }
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = WhatHanziConfig::default();
        config.bot.answer_timeout = Some(60);
        config.i18n.default_locale = "ko_KR".into();
        config.sessions.capacity = 0;
        config.sessions.idle_ttl_secs = 0;

        let settings = pipeline_settings(&config);
        assert_eq!(settings.answer_timeout, Some(Duration::from_secs(60)));
        assert_eq!(settings.default_locale, "ko_KR");
        assert_eq!(settings.session_policy.capacity, 1);
        assert!(settings.session_policy.idle_ttl.is_none());
    }

    #[test]
    fn missing_token_refuses_to_start() {
        let config = WhatHanziConfig::default();
        assert!(ensure_runnable(&config).is_err());
    }

    #[test]
    fn catalog_overlay_replaces_embedded_strings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("en.yaml"),
            "lang:\n  command: Pick a language\n",
        )
        .unwrap();

        let config = I18nConfig {
            default_locale: "en".into(),
            directory: Some(dir.path().to_path_buf()),
        };
        let catalog = build_catalog(&config).unwrap();
        assert_eq!(catalog.t("en", "lang.command"), "Pick a language");
        assert_eq!(catalog.t("ko_KR", "lang.command"), "봇 언어 바꾸기");
    }

    #[test]
    fn missing_overlay_directory_is_an_error() {
        let config = I18nConfig {
            default_locale: "en".into(),
            directory: Some("/nonexistent/whathanzi-locales".into()),
        };
        assert!(build_catalog(&config).is_err());
    }
}
