use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog for locale {locale}: {message}")]
    InvalidCatalog { locale: String, message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_catalog(locale: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidCatalog {
            locale: locale.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
