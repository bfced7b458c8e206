use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use smartpower_core::config::ONETIME_TOLERANCE_SECS;
use smartpower_core::ports::{ActionExecutor, DisplayHint};
use smartpower_core::types::{floor_to_minute, weekday_index};
use smartpower_core::{Action, Kind};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::gate::ConfirmationGate;
use crate::resolver::next_event;
use crate::store::{lock_store, ScheduleStore, SharedStore};
use crate::types::{NextEvent, Trigger};

/// What a single [`Monitor::check_and_execute`] pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// This minute was already processed.
    SameMinute,
    NoMatch,
    /// Matched a recurring slot that the skip list suppressed.
    Skipped { trigger: Trigger },
    /// Debug mode: logged and discarded.
    DryRun { trigger: Trigger },
    /// Handed to the confirmation gate.
    Pending { trigger: Trigger },
    /// The gate already held a confirmation.
    Rejected { trigger: Trigger },
}

/// Sent from the poller task to the UI task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Emitted once per new minute with the freshly resolved next event.
    NextEvent(Option<NextEvent>),
    ConfirmationRequested { trigger: Trigger, remaining: u32 },
    Countdown { remaining: u32 },
    Executed { trigger: Trigger, ok: bool },
    Cancelled { trigger: Trigger },
    Suppressed { trigger: Trigger },
    DryRun { trigger: Trigger },
    Rejected { trigger: Trigger },
}

/// UI → poller answers to a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCommand {
    Confirm,
    Cancel,
}

/// Minute-boundary trigger matching for local actions.
pub struct Monitor {
    gate: ConfirmationGate,
    last_minute: Option<NaiveDateTime>,
    executor: Arc<dyn ActionExecutor>,
    display: Arc<dyn DisplayHint>,
}

impl Monitor {
    pub fn new(
        executor: Arc<dyn ActionExecutor>,
        display: Arc<dyn DisplayHint>,
        countdown_secs: u32,
    ) -> Self {
        Self {
            gate: ConfirmationGate::new(countdown_secs),
            last_minute: None,
            executor,
            display,
        }
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Match `now` against the store, at most once per minute.
    ///
    /// One-time entries are checked first, then weekly, then daily; the first
    /// match ends the pass.
    pub fn check_and_execute(
        &mut self,
        store: &mut ScheduleStore,
        now: NaiveDateTime,
    ) -> MonitorOutcome {
        let minute = floor_to_minute(now);
        if self.last_minute == Some(minute) {
            return MonitorOutcome::SameMinute;
        }
        self.last_minute = Some(minute);
        store.refresh();

        let Some(trigger) = self.match_trigger(store, now) else {
            return MonitorOutcome::NoMatch;
        };

        if trigger.kind != Kind::OneTime && store.is_skipped(trigger.slot) {
            info!(trigger = %trigger, "occurrence skipped by user");
            store.remove_skip(trigger.slot);
            return MonitorOutcome::Skipped { trigger };
        }

        if store.state().debug_mode {
            info!(trigger = %trigger, "debug mode, action not executed");
            return MonitorOutcome::DryRun { trigger };
        }

        match self.gate.begin(trigger.clone(), now) {
            Ok(()) => {
                self.display.keep_display_awake();
                MonitorOutcome::Pending { trigger }
            }
            Err(e) => {
                warn!(trigger = %trigger, "{e}");
                MonitorOutcome::Rejected { trigger }
            }
        }
    }

    fn match_trigger(&self, store: &mut ScheduleStore, now: NaiveDateTime) -> Option<Trigger> {
        let state = store.state();

        let onetime = state
            .onetime
            .iter()
            .find(|o| {
                !o.executed
                    && o.action.is_local()
                    && (now - o.datetime).num_seconds().abs() <= ONETIME_TOLERANCE_SECS
            })
            .map(|o| Trigger {
                action: o.action,
                kind: Kind::OneTime,
                entry_id: Some(o.id.clone()),
                slot: o.datetime,
            });
        if let Some(trigger) = onetime {
            if let Some(id) = &trigger.entry_id {
                store.mark_executed(id);
            }
            return Some(trigger);
        }

        let slot = floor_to_minute(now);
        let (weekday, hour, minute) = (weekday_index(&now), now.hour() as u8, now.minute() as u8);

        if let Some(w) = state.weekly_schedules.iter().find(|w| {
            w.action.is_local() && w.weekday == weekday && w.hour == hour && w.minute == minute
        }) {
            return Some(Trigger {
                action: w.action,
                kind: Kind::Weekly,
                entry_id: Some(w.id.clone()),
                slot,
            });
        }

        Action::LOCAL.into_iter().find_map(|action| {
            let d = state.daily(action);
            (d.enabled && d.hour == hour && d.minute == minute).then(|| Trigger {
                action,
                kind: Kind::Daily,
                entry_id: None,
                slot,
            })
        })
    }

    /// One countdown second. Executes on timeout.
    pub fn tick_countdown(&mut self) -> Option<(Trigger, bool)> {
        let trigger = self.gate.tick()?;
        let ok = self.execute(&trigger);
        Some((trigger, ok))
    }

    pub fn confirm(&mut self) -> Option<(Trigger, bool)> {
        let trigger = self.gate.confirm()?;
        let ok = self.execute(&trigger);
        Some((trigger, ok))
    }

    pub fn cancel(&mut self) -> Option<Trigger> {
        let trigger = self.gate.cancel()?;
        self.display.reset_power_state();
        if let Err(e) = self.executor.abort_pending() {
            warn!("abort request failed: {e}");
        }
        self.gate.settle();
        Some(trigger)
    }

    fn execute(&self, trigger: &Trigger) -> bool {
        self.display.reset_power_state();
        match self.executor.execute(trigger.action) {
            Ok(()) => {
                info!(trigger = %trigger, "action executed");
                true
            }
            Err(e) => {
                error!(trigger = %trigger, "action failed: {e}");
                false
            }
        }
    }

    /// Poll loop on the local wall clock. Runs until `shutdown` broadcasts
    /// `true`.
    pub async fn run(
        self,
        store: SharedStore,
        events: mpsc::UnboundedSender<MonitorEvent>,
        commands: mpsc::Receiver<GateCommand>,
        shutdown: watch::Receiver<bool>,
        poll: Duration,
    ) {
        let clock = || chrono::Local::now().naive_local();
        self.run_with_clock(store, events, commands, shutdown, poll, clock)
            .await
    }

    /// [`Monitor::run`] with the wall clock supplied by the caller.
    pub async fn run_with_clock<C>(
        mut self,
        store: SharedStore,
        events: mpsc::UnboundedSender<MonitorEvent>,
        mut commands: mpsc::Receiver<GateCommand>,
        mut shutdown: watch::Receiver<bool>,
        poll: Duration,
        clock: C,
    ) where
        C: Fn() -> NaiveDateTime + Send,
    {
        info!(poll_ms = poll.as_millis() as u64, "monitor started");
        let mut poll_tick = tokio::time::interval(poll);
        let mut countdown = tokio::time::interval(Duration::from_secs(1));
        countdown.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll_tick.tick() => {
                    let now = clock();
                    let new_minute = self.last_minute != Some(floor_to_minute(now));
                    let (outcome, next) = {
                        let mut guard = lock_store(&store);
                        let outcome = self.check_and_execute(&mut guard, now);
                        let next = new_minute
                            .then(|| next_event(guard.state(), &Action::LOCAL, now));
                        (outcome, next)
                    };
                    if let Some(next) = next {
                        let _ = events.send(MonitorEvent::NextEvent(next));
                    }
                    if matches!(outcome, MonitorOutcome::Pending { .. }) {
                        // Count whole seconds from the moment the prompt appears.
                        countdown.reset();
                    }
                    if let Some(event) = self.outcome_event(outcome) {
                        let _ = events.send(event);
                    }
                }
                _ = countdown.tick() => {
                    if !self.gate.is_pending() {
                        continue;
                    }
                    match self.tick_countdown() {
                        Some((trigger, ok)) => {
                            let _ = events.send(MonitorEvent::Executed { trigger, ok });
                        }
                        None => {
                            if let Some(remaining) = self.gate.remaining() {
                                let _ = events.send(MonitorEvent::Countdown { remaining });
                            }
                        }
                    }
                }
                Some(cmd) = commands.recv() => {
                    let event = match cmd {
                        GateCommand::Confirm => self
                            .confirm()
                            .map(|(trigger, ok)| MonitorEvent::Executed { trigger, ok }),
                        GateCommand::Cancel => self
                            .cancel()
                            .map(|trigger| MonitorEvent::Cancelled { trigger }),
                    };
                    match event {
                        Some(event) => {
                            let _ = events.send(event);
                        }
                        None => warn!(?cmd, "no confirmation pending"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("monitor shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn outcome_event(&self, outcome: MonitorOutcome) -> Option<MonitorEvent> {
        match outcome {
            MonitorOutcome::SameMinute | MonitorOutcome::NoMatch => None,
            MonitorOutcome::Skipped { trigger } => Some(MonitorEvent::Suppressed { trigger }),
            MonitorOutcome::DryRun { trigger } => Some(MonitorEvent::DryRun { trigger }),
            MonitorOutcome::Rejected { trigger } => Some(MonitorEvent::Rejected { trigger }),
            MonitorOutcome::Pending { trigger } => Some(MonitorEvent::ConfirmationRequested {
                trigger,
                remaining: self.gate.remaining().unwrap_or_default(),
            }),
        }
    }
}
