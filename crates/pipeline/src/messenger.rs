use {async_trait::async_trait, whathanzi_glyph::RenderArtifact};

use crate::{
    error::Result,
    types::{ChatId, MessageRef},
};

/// How message text should be interpreted by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// Inline keyboard button that sends `payload` back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub payload: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// A text reply, optionally with an inline keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingText {
    pub text: String,
    pub format: TextFormat,
    /// Rows of buttons, top to bottom.
    pub keyboard: Vec<Vec<InlineButton>>,
}

impl OutgoingText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: Vec<InlineButton>) -> Self {
        self.keyboard.push(row);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.keyboard.iter().flatten()
    }
}

/// Outbound side of the chat transport.
///
/// Every call may fail; the pipeline reports failures to the user once and
/// never retries.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a new text message to `chat`.
    async fn reply(&self, chat: ChatId, message: OutgoingText) -> Result<MessageRef>;

    /// Replace the text of a text message (drops its keyboard).
    async fn edit_text(&self, message: MessageRef, text: &str, format: TextFormat) -> Result<()>;

    /// Replace the caption of a media message.
    async fn edit_caption(
        &self,
        message: MessageRef,
        caption: &str,
        format: TextFormat,
    ) -> Result<()>;

    /// Swap the photo of a media message in place, setting `caption`.
    async fn edit_media(
        &self,
        message: MessageRef,
        artifact: &RenderArtifact,
        caption: &str,
    ) -> Result<()>;

    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Send a photo referenced by URL with a caption.
    async fn reply_with_photo(&self, chat: ChatId, url: &str, caption: &str)
    -> Result<MessageRef>;
}
