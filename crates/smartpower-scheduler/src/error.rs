use smartpower_core::{Action, SmartPowerError};
use thiserror::Error;

use crate::conflict::Conflict;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Out-of-range field or unparseable date. Nothing was committed.
    #[error("Invalid schedule: {0}")]
    Validation(String),

    /// The opposing action already occupies the slot. Nothing was committed.
    #[error("Schedule conflict: {0}")]
    Conflict(Conflict),

    /// The state file could not be read, parsed or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The state file failed to load earlier; writing now could destroy it.
    #[error("Saving is disabled because the state file failed to load")]
    SaveSuppressed,

    /// No entry with the given ID exists in the store.
    #[error("Entry not found: {id}")]
    NotFound { id: String },

    /// A confirmation is already waiting; only one may exist at a time.
    #[error("A {action} confirmation is already pending")]
    AlreadyPending { action: Action },
}

impl From<SmartPowerError> for SchedulerError {
    fn from(e: SmartPowerError) -> Self {
        match e {
            SmartPowerError::Validation(msg) => SchedulerError::Validation(msg),
            other => SchedulerError::Persistence(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
