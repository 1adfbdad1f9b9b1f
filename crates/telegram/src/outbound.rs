use {
    async_trait::async_trait,
    std::{future::Future, time::Duration},
    teloxide::{
        ApiError, RequestError,
        payloads::{
            EditMessageCaptionSetters, EditMessageTextSetters, SendMessageSetters,
            SendPhotoSetters,
        },
        prelude::*,
        types::{
            ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia,
            InputMediaPhoto, MessageId, ParseMode,
        },
    },
    tracing::{debug, warn},
};

use {
    whathanzi_glyph::RenderArtifact,
    whathanzi_pipeline::{
        ChatId, Error as PipelineError, MessageRef, Messenger, OutgoingText, Result, TextFormat,
    },
};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Telegram caption size limit for media messages.
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

/// [`Messenger`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        chat: ChatId,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = chat.0,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = chat.0,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }

    /// Edits that leave the message unchanged count as success.
    async fn run_edit<T, F, Fut>(
        &self,
        message: MessageRef,
        operation: &'static str,
        request: F,
    ) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        match self.run_with_retry(message.chat, operation, request).await {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => {
                debug!(%message, operation, "telegram message not modified");
                Ok(())
            },
            Err(e) => Err(PipelineError::transport(operation, e)),
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn reply(&self, chat: ChatId, message: OutgoingText) -> Result<MessageRef> {
        let keyboard = keyboard(&message);
        let sent = self
            .run_with_retry(chat, "send message", || {
                let mut req = self.bot.send_message(tg_chat(chat), message.text.as_str());
                if let Some(mode) = parse_mode(message.format) {
                    req = req.parse_mode(mode);
                }
                if let Some(markup) = &keyboard {
                    req = req.reply_markup(markup.clone());
                }
                async move { req.await }
            })
            .await
            .map_err(|e| PipelineError::transport("send message", e))?;
        Ok(MessageRef::new(chat, sent.id.0))
    }

    async fn edit_text(&self, message: MessageRef, text: &str, format: TextFormat) -> Result<()> {
        self.run_edit(message, "edit message text", || {
            let mut req = self
                .bot
                .edit_message_text(tg_chat(message.chat), MessageId(message.id), text);
            if let Some(mode) = parse_mode(format) {
                req = req.parse_mode(mode);
            }
            async move { req.await }
        })
        .await
    }

    async fn edit_caption(
        &self,
        message: MessageRef,
        caption: &str,
        format: TextFormat,
    ) -> Result<()> {
        let caption = truncate_caption(caption);
        self.run_edit(message, "edit message caption", || {
            let mut req = self
                .bot
                .edit_message_caption(tg_chat(message.chat), MessageId(message.id))
                .caption(caption);
            if let Some(mode) = parse_mode(format) {
                req = req.parse_mode(mode);
            }
            async move { req.await }
        })
        .await
    }

    async fn edit_media(
        &self,
        message: MessageRef,
        artifact: &RenderArtifact,
        caption: &str,
    ) -> Result<()> {
        let caption = truncate_caption(caption);
        self.run_edit(message, "edit message media", || {
            let photo =
                InputFile::memory(artifact.data.clone()).file_name(artifact.file_name.clone());
            let media = InputMedia::Photo(InputMediaPhoto::new(photo).caption(caption));
            let req = self
                .bot
                .edit_message_media(tg_chat(message.chat), MessageId(message.id), media);
            async move { req.await }
        })
        .await
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.run_with_retry(message.chat, "delete message", || {
            let req = self
                .bot
                .delete_message(tg_chat(message.chat), MessageId(message.id));
            async move { req.await }
        })
        .await
        .map_err(|e| PipelineError::transport("delete message", e))?;
        Ok(())
    }

    async fn reply_with_photo(
        &self,
        chat: ChatId,
        url: &str,
        caption: &str,
    ) -> Result<MessageRef> {
        let url =
            reqwest::Url::parse(url).map_err(|e| PipelineError::transport("send photo", e))?;
        let caption = truncate_caption(caption);
        let sent = self
            .run_with_retry(chat, "send photo", || {
                let req = self
                    .bot
                    .send_photo(tg_chat(chat), InputFile::url(url.clone()))
                    .caption(caption);
                async move { req.await }
            })
            .await
            .map_err(|e| PipelineError::transport("send photo", e))?;
        Ok(MessageRef::new(chat, sent.id.0))
    }
}

fn tg_chat(chat: ChatId) -> TgChatId {
    TgChatId(chat.0)
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Html => Some(ParseMode::Html),
    }
}

fn keyboard(message: &OutgoingText) -> Option<InlineKeyboardMarkup> {
    if message.keyboard.is_empty() {
        return None;
    }
    let rows = message.keyboard.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(&button.label, &button.payload))
            .collect::<Vec<_>>()
    });
    Some(InlineKeyboardMarkup::new(rows))
}

fn truncate_caption(caption: &str) -> &str {
    &caption[..caption.floor_char_boundary(TELEGRAM_CAPTION_LIMIT)]
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}
