use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmartPowerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Action executor failed: {0}")]
    Executor(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SmartPowerError {
    /// Short error code string, stable across releases (used in HTTP error bodies).
    pub fn code(&self) -> &'static str {
        match self {
            SmartPowerError::Config(_) => "CONFIG_ERROR",
            SmartPowerError::Validation(_) => "VALIDATION_ERROR",
            SmartPowerError::Executor(_) => "EXECUTOR_ERROR",
            SmartPowerError::Serialization(_) => "SERIALIZATION_ERROR",
            SmartPowerError::Io(_) => "IO_ERROR",
            SmartPowerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SmartPowerError>;
