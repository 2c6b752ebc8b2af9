use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}
