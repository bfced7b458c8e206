use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::error::{Result, SchedulerError};
use crate::types::Trigger;

/// Where the single system-wide confirmation currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Pending {
        trigger: Trigger,
        since: NaiveDateTime,
        /// Seconds left before the action runs without an answer.
        remaining: u32,
    },
    /// Terminal for the trigger; the executor has been (or is being) called.
    Executing { trigger: Trigger },
    /// User declined. [`ConfirmationGate::settle`] returns to `Idle`.
    Cancelled { trigger: Trigger },
}

/// Holds a triggered action until the user confirms, cancels or the
/// countdown runs out. Running out executes (fail-open).
#[derive(Debug)]
pub struct ConfirmationGate {
    state: GateState,
    countdown: u32,
}

impl ConfirmationGate {
    pub fn new(countdown: u32) -> Self {
        Self {
            state: GateState::Idle,
            countdown: countdown.max(1),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, GateState::Pending { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            GateState::Pending { remaining, .. } => Some(remaining),
            _ => None,
        }
    }

    /// Start a confirmation. A second trigger while one is pending is refused
    /// and the outstanding one is left as it was.
    pub fn begin(&mut self, trigger: Trigger, now: NaiveDateTime) -> Result<()> {
        if let GateState::Pending { trigger: held, .. } = &self.state {
            warn!(
                pending = %held,
                rejected = %trigger,
                "confirmation already pending, trigger rejected"
            );
            return Err(SchedulerError::AlreadyPending {
                action: held.action,
            });
        }
        info!(trigger = %trigger, countdown = self.countdown, "confirmation requested");
        self.state = GateState::Pending {
            trigger,
            since: now,
            remaining: self.countdown,
        };
        Ok(())
    }

    /// One second elapsed. Returns the trigger once the countdown hits zero.
    pub fn tick(&mut self) -> Option<Trigger> {
        let GateState::Pending { remaining, .. } = &mut self.state else {
            return None;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return None;
        }
        let trigger = self.take_pending()?;
        info!(trigger = %trigger, "no answer before timeout, executing");
        self.state = GateState::Executing {
            trigger: trigger.clone(),
        };
        Some(trigger)
    }

    pub fn confirm(&mut self) -> Option<Trigger> {
        let trigger = self.take_pending()?;
        info!(trigger = %trigger, "confirmed");
        self.state = GateState::Executing {
            trigger: trigger.clone(),
        };
        Some(trigger)
    }

    pub fn cancel(&mut self) -> Option<Trigger> {
        let trigger = self.take_pending()?;
        info!(trigger = %trigger, "cancelled");
        self.state = GateState::Cancelled {
            trigger: trigger.clone(),
        };
        Some(trigger)
    }

    /// `Cancelled` → `Idle`. Other states are left alone.
    pub fn settle(&mut self) {
        if matches!(self.state, GateState::Cancelled { .. }) {
            self.state = GateState::Idle;
        }
    }

    fn take_pending(&mut self) -> Option<Trigger> {
        match &self.state {
            GateState::Pending { trigger, .. } => Some(trigger.clone()),
            _ => None,
        }
    }
}
