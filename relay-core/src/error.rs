use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
