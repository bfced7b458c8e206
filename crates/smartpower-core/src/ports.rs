//! Collaborator interfaces the scheduling core calls out to.
//!
//! The core never talks to the operating system directly. The desktop binary
//! provides real implementations; tests provide recording fakes.

use crate::error::Result;
use crate::types::Action;

/// Carries out a local power action.
pub trait ActionExecutor: Send + Sync {
    /// Fire-and-forget: returns once the OS accepted (or refused) the request.
    fn execute(&self, action: Action) -> Result<()>;

    /// Abort a shutdown/restart the OS has already been asked to perform.
    fn abort_pending(&self) -> Result<()>;
}

/// Keeps the display on while a confirmation prompt is visible.
pub trait DisplayHint: Send + Sync {
    fn keep_display_awake(&self);

    /// Return the power/display policy to the system default.
    fn reset_power_state(&self);
}
