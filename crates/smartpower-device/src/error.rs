use smartpower_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// Every fixed slot of the table is taken.
    #[error("{table} table is full ({capacity} slots)")]
    Full {
        table: &'static str,
        capacity: usize,
    },

    /// Out-of-range field in a single-entry edit.
    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("No {table} entry at index {index}")]
    IndexOutOfRange { table: &'static str, index: usize },

    /// Neither the request nor the last sync supplied a MAC address.
    #[error("No wake target configured")]
    NoTarget,

    #[error("Unknown wake target: {0}")]
    UnknownTarget(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Short error code string, returned in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DeviceError::Full { .. } => "SLOTS_FULL",
            DeviceError::Invalid(_) => "BAD_REQUEST",
            DeviceError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            DeviceError::NoTarget => "NO_TARGET",
            DeviceError::UnknownTarget(_) => "UNKNOWN_TARGET",
            DeviceError::Protocol(_) => "BAD_REQUEST",
            DeviceError::Network(_) => "NETWORK_ERROR",
            DeviceError::Io(_) => "IO_ERROR",
        }
    }
}

impl From<smartpower_core::SmartPowerError> for DeviceError {
    fn from(e: smartpower_core::SmartPowerError) -> Self {
        DeviceError::Invalid(e.to_string())
    }
}

impl From<reqwest::Error> for DeviceError {
    fn from(e: reqwest::Error) -> Self {
        DeviceError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
