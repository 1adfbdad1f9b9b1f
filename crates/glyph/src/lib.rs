//! Glyph rendering: turns a single character into a PNG image.
//!
//! Rasterization itself happens in an external service; this crate fetches
//! the image and normalizes it into something Telegram accepts as a photo.

pub mod error;
pub mod http;
pub mod image_ops;

use async_trait::async_trait;

pub use {
    error::{Error, Result},
    http::HttpGlyphRenderer,
};

/// A rendered image ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArtifact {
    pub data: Vec<u8>,
    pub media_type: String,
    pub file_name: String,
}

#[async_trait]
pub trait GlyphRenderer: Send + Sync {
    async fn render(&self, character: char) -> Result<RenderArtifact>;
}
