use thiserror::Error;

#[derive(Debug, Error)]
pub enum VeraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VeraError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            VeraError::Config(_) => "CONFIG_ERROR",
            VeraError::Serialization(_) => "SERIALIZATION_ERROR",
            VeraError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, VeraError>;
