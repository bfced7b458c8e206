use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// One item of a batch field could not be parsed; the item is dropped.
    #[error("Malformed {field} item '{raw}': {reason}")]
    MalformedItem {
        field: &'static str,
        raw: String,
        reason: String,
    },

    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
}
