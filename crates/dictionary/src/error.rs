#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("invalid record for U+{code_point:04X}: {message}")]
    InvalidRecord { code_point: u32, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
