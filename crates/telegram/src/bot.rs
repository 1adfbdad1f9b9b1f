use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, CallbackQuery, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use whathanzi_pipeline::{Pipeline, request::LOCALE_COMMAND};

use crate::{
    config::TelegramConfig,
    error::{Error, Result},
    inbound,
};

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A connected bot and the username Telegram knows it by.
#[derive(Clone)]
pub struct BotHandle {
    pub bot: Bot,
    pub username: Option<String>,
}

/// Build the bot client, verify the token and prepare it for long polling.
///
/// Clears any webhook (long polling and webhooks are exclusive) and
/// registers `/lang` with `command_description` for client autocomplete.
pub async fn connect(config: &TelegramConfig, command_description: &str) -> Result<BotHandle> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(config.client_timeout())
        .build()?;
    let mut bot = Bot::with_client(config.token.expose_secret(), client);
    if let Some(api_url) = &config.api_url {
        let api_url =
            reqwest::Url::parse(api_url).map_err(|e| Error::invalid_api_url(api_url, e))?;
        bot = bot.set_api_url(api_url);
    }

    let me = bot.get_me().await?;
    let username = me.username.clone();

    bot.delete_webhook().send().await?;

    let commands = vec![BotCommand::new(LOCALE_COMMAND, command_description)];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "failed to register bot commands");
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok(BotHandle { bot, username })
}

/// Poll for updates until `cancel` fires or another instance takes over
/// the token. Every update is handled on its own task.
pub fn start_polling(
    handle: BotHandle,
    pipeline: Arc<Pipeline>,
    poll_timeout_secs: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram manual polling loop");
        let BotHandle { bot, username } = handle;
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(poll_timeout_secs)
                    .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        route_update(&bot, &pipeline, username.as_deref(), update.kind);
                    }
                },
                Err(e) => {
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        warn!(
                            "telegram polling stopped: another instance is already running with this token"
                        );
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
        info!("telegram polling stopped");
    })
}

fn route_update(bot: &Bot, pipeline: &Arc<Pipeline>, username: Option<&str>, kind: UpdateKind) {
    match kind {
        UpdateKind::Message(msg) => {
            debug!(chat_id = msg.chat.id.0, "received telegram message");
            let Some(event) = inbound::from_message(&msg, username) else {
                return;
            };
            let pipeline = Arc::clone(pipeline);
            tokio::spawn(async move { pipeline.handle(event).await });
        },
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "received telegram callback query");
            let bot = bot.clone();
            let pipeline = Arc::clone(pipeline);
            tokio::spawn(async move { handle_callback(&bot, &pipeline, query).await });
        },
        other => {
            debug!("ignoring non-message update: {other:?}");
        },
    }
}

async fn handle_callback(bot: &Bot, pipeline: &Pipeline, query: CallbackQuery) {
    // Dismisses the client's loading spinner on the pressed button.
    if let Err(e) = bot.answer_callback_query(&query.id).await {
        debug!(error = %e, "failed to answer callback query");
    }
    if let Some(event) = inbound::from_callback(&query) {
        pipeline.handle(event).await;
    } else {
        debug!(query_id = %query.id, "ignoring callback query without data");
    }
}
