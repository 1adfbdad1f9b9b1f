use std::time::Duration;

use {async_trait::async_trait, tracing::debug, url::Url};

use crate::{
    GlyphRenderer, RenderArtifact,
    error::{Error, Result},
    image_ops,
};

const CODE_POINT_PLACEHOLDER: &str = "{codepoint}";
const CHAR_PLACEHOLDER: &str = "{char}";

/// Renders glyphs by asking an HTTP rasterizer for an image.
///
/// The endpoint is a URL template: `{codepoint}` expands to the upper-case
/// hex code point (`4E2D`) and `{char}` to the percent-encoded character.
/// A template with neither gets a `character` query parameter appended.
pub struct HttpGlyphRenderer {
    client: reqwest::Client,
    endpoint: String,
    max_dimension: u32,
}

impl HttpGlyphRenderer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, max_dimension: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::external("failed to build HTTP client", e))?;
        Self::with_client(client, endpoint, max_dimension)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        max_dimension: u32,
    ) -> Result<Self> {
        let renderer = Self {
            client,
            endpoint: endpoint.into(),
            max_dimension,
        };
        // Fail at startup rather than on the first lookup.
        renderer.request_url('A')?;
        Ok(renderer)
    }

    pub fn request_url(&self, character: char) -> Result<Url> {
        let has_placeholder = self.endpoint.contains(CODE_POINT_PLACEHOLDER)
            || self.endpoint.contains(CHAR_PLACEHOLDER);
        let expanded = self
            .endpoint
            .replace(CODE_POINT_PLACEHOLDER, &format!("{:04X}", u32::from(character)))
            .replace(
                CHAR_PLACEHOLDER,
                &urlencoding::encode(character.encode_utf8(&mut [0; 4])),
            );

        let mut url = Url::parse(&expanded).map_err(|e| {
            Error::invalid_input(format!("invalid renderer endpoint {}: {e}", self.endpoint))
        })?;
        if !has_placeholder {
            url.query_pairs_mut()
                .append_pair("character", &character.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl GlyphRenderer for HttpGlyphRenderer {
    async fn render(&self, character: char) -> Result<RenderArtifact> {
        let url = self.request_url(character)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::external("rasterizer request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                character,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::external("failed to read rasterizer response", e))?;
        let normalized = image_ops::normalize_png(&body, self.max_dimension)?;

        debug!(
            character = %character,
            original_size = body.len(),
            final_size = normalized.data.len(),
            dims = %format!("{}x{}", normalized.width, normalized.height),
            was_resized = normalized.was_resized,
            "glyph rendered"
        );

        Ok(RenderArtifact {
            data: normalized.data,
            media_type: "image/png".to_string(),
            file_name: format!("{:04X}.png", u32::from(character)),
        })
    }
}
