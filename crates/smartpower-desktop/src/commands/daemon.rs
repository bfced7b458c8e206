//! Foreground scheduler. The monitor runs as its own task; this task owns the
//! terminal, relays confirmation answers and applies device syncs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use smartpower_core::Action;
use smartpower_protocol::ScheduleSnapshot;
use smartpower_scheduler::{
    lock_store, next_event, GateCommand, Monitor, MonitorEvent, SharedStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::{now, Context};
use crate::executor::{LogDisplayHint, OsExecutor};
use crate::sync_client::SyncError;

const HELP: &str = "Commands: y = run now, n = cancel, sync = pull device schedule, next, q = quit";

/// A line typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Confirm,
    Cancel,
    Sync,
    Next,
    Help,
    Quit,
    Unknown,
}

pub fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Input::Confirm,
        "n" | "no" | "c" | "cancel" => Input::Cancel,
        "sync" | "s" => Input::Sync,
        "next" => Input::Next,
        "?" | "h" | "help" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => Input::Unknown,
    }
}

/// Text for a monitor event. Countdown ticks are thinned out.
pub fn describe(event: &MonitorEvent) -> Option<String> {
    Some(match event {
        MonitorEvent::NextEvent(Some(next)) => format!("Next: {next}"),
        MonitorEvent::NextEvent(None) => "Next: nothing scheduled".to_string(),
        MonitorEvent::ConfirmationRequested { trigger, remaining } => format!(
            "{trigger} is due. Runs in {remaining}s unless cancelled [y = now / n = cancel]"
        ),
        MonitorEvent::Countdown { remaining } => {
            if *remaining % 10 != 0 && *remaining > 5 {
                return None;
            }
            format!("  {remaining}s...")
        }
        MonitorEvent::Executed { trigger, ok: true } => format!("Executed {trigger}"),
        MonitorEvent::Executed { trigger, ok: false } => {
            format!("FAILED to execute {trigger} (see log)")
        }
        MonitorEvent::Cancelled { trigger } => format!("Cancelled {trigger}"),
        MonitorEvent::Suppressed { trigger } => format!("Skipped {trigger}"),
        MonitorEvent::DryRun { trigger } => format!("[debug] would execute {trigger}"),
        MonitorEvent::Rejected { trigger } => {
            format!("Ignored {trigger}: another action is awaiting confirmation")
        }
    })
}

type SyncResult = Result<ScheduleSnapshot, SyncError>;

/// Fetch the device schedule in the background. No-op when no device is set.
fn spawn_sync(ctx: &Context, store: &SharedStore, results: &mpsc::UnboundedSender<SyncResult>) {
    let client = match ctx.device_client(lock_store(store).state()) {
        Ok(client) => client,
        Err(SyncError::NotConfigured) => {
            debug!("no device configured, sync skipped");
            return;
        }
        Err(e) => {
            let _ = results.send(Err(e));
            return;
        }
    };
    let results = results.clone();
    tokio::spawn(async move {
        let _ = results.send(client.fetch().await);
    });
}

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_shared();
    {
        let guard = lock_store(&store);
        if !guard.state().disclaimer_accepted {
            bail!("run `smartpower accept-disclaimer` before starting the scheduler");
        }
        if guard.load_failed() {
            warn!("state file could not be read; running without saving changes");
        }
    }

    let monitor = Monitor::new(
        Arc::new(OsExecutor),
        Arc::new(LogDisplayHint),
        ctx.config.confirm_countdown_secs,
    );
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll = Duration::from_millis(ctx.config.poll_interval_ms.max(1));
    let handle = tokio::spawn(monitor.run(
        store.clone(),
        event_tx,
        command_rx,
        shutdown_rx,
        poll,
    ));

    let (sync_tx, mut syncs) = mpsc::unbounded_channel();
    spawn_sync(ctx, &store, &sync_tx);

    println!("SmartPower running. {HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if let Some(text) = describe(&event) {
                    println!("{text}");
                }
            }
            Some(result) = syncs.recv() => match result {
                Ok(snapshot) => {
                    lock_store(&store).replace_wake_schedule(&snapshot);
                    println!(
                        "Device schedule synced ({} weekly, {} one-time)",
                        snapshot.weekly.len(),
                        snapshot.onetime.len()
                    );
                }
                Err(e) => warn!("device sync failed: {e}"),
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Input::Confirm => {
                        let _ = command_tx.send(GateCommand::Confirm).await;
                    }
                    Input::Cancel => {
                        let _ = command_tx.send(GateCommand::Cancel).await;
                    }
                    Input::Sync => spawn_sync(ctx, &store, &sync_tx),
                    Input::Next => {
                        let next = next_event(lock_store(&store).state(), &Action::LOCAL, now());
                        match next {
                            Some(next) => println!("Next: {next}"),
                            None => println!("Next: nothing scheduled"),
                        }
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Unknown => {
                        if !line.trim().is_empty() {
                            println!("{HELP}");
                        }
                    }
                },
                Ok(None) => {
                    debug!("stdin closed; running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        warn!("monitor task ended abnormally: {e}");
    }
    info!("scheduler stopped");
    Ok(())
}
