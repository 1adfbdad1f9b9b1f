use thiserror::Error;

/// Failures while setting up the Telegram connection.
///
/// Errors raised while handling events go through the pipeline's own error
/// type instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bot API request failed: {0}")]
    Api(#[from] teloxide::RequestError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid Bot API url {url:?}: {message}")]
    InvalidApiUrl { url: String, message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_api_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidApiUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
