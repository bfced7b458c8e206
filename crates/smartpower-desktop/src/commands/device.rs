//! Companion device commands. A wake schedule edit starts from the schedule
//! the device currently holds, is pushed back as a whole, and the device's
//! answer replaces the local cache.

use anyhow::bail;
use chrono::NaiveDateTime;
use clap::Subcommand;
use smartpower_core::config::DEVICE_SLOT_CAPACITY;
use smartpower_core::types::{floor_to_minute, format_slot, validate_weekday, weekday_name};
use smartpower_core::OneTimeSource;
use smartpower_protocol::{MacAddress, OneTimeSlot, ScheduleSnapshot, SyncRequest, WeeklySlot};
use smartpower_scheduler::ScheduleStore;
use tracing::debug;

use super::{now, slot_arg, weekday_arg, Context, TimeOfDay};
use crate::sync_client::{DeviceClient, SyncError};

#[derive(Subcommand)]
pub enum DeviceAction {
    /// Set the device address and the MAC it wakes
    Set {
        /// IP or host[:port] of the device
        #[arg(long)]
        ip: Option<String>,
        /// Hardware address of the machine to wake
        #[arg(long)]
        mac: Option<MacAddress>,
    },
    /// Show the cached wake schedule
    Show,
    /// Refresh the cache from the device
    Pull,
    /// Set or disable the daily wake
    Daily {
        /// HH:MM
        at: Option<TimeOfDay>,
        #[arg(long)]
        disable: bool,
    },
    /// Add a weekly wake
    WeeklyAdd {
        #[arg(value_parser = weekday_arg)]
        weekday: u8,
        at: TimeOfDay,
    },
    /// Remove a weekly wake by position
    WeeklyRemove { index: usize },
    /// Add a one-time wake, "YYYY-MM-DD HH:MM"
    OnceAdd {
        #[arg(value_parser = slot_arg)]
        at: NaiveDateTime,
    },
    /// Remove a one-time wake by position
    OnceRemove { index: usize },
    /// Send a magic packet now (defaults to the synced MAC)
    Wake { mac: Option<MacAddress> },
    /// Wake a target configured on the device by name
    WakeName { name: String },
}

/// A single change to the wake schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeEdit {
    Daily { at: Option<TimeOfDay>, enabled: bool },
    AddWeekly { weekday: u8, at: TimeOfDay },
    RemoveWeekly(usize),
    AddOnce(NaiveDateTime),
    RemoveOnce(usize),
}

/// Apply `edit` to `snapshot`, refusing anything the device would drop or
/// never fire.
pub fn apply_edit(
    snapshot: &mut ScheduleSnapshot,
    edit: WakeEdit,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    match edit {
        WakeEdit::Daily { at, enabled } => {
            if let Some(at) = at {
                snapshot.daily.hour = at.hour;
                snapshot.daily.minute = at.minute;
            } else if enabled {
                bail!("a time is required to enable the daily wake");
            }
            snapshot.daily.enabled = enabled;
        }
        WakeEdit::AddWeekly { weekday, at } => {
            validate_weekday(weekday)?;
            ensure_room(snapshot.weekly.len(), "weekly")?;
            snapshot.weekly.push(WeeklySlot {
                weekday,
                hour: at.hour,
                minute: at.minute,
            });
        }
        WakeEdit::RemoveWeekly(index) => {
            if index >= snapshot.weekly.len() {
                bail!("no weekly wake at index {index}");
            }
            snapshot.weekly.remove(index);
        }
        WakeEdit::AddOnce(at) => {
            if floor_to_minute(at) < floor_to_minute(now) {
                bail!("{} is in the past", format_slot(at));
            }
            ensure_room(snapshot.onetime.len(), "one-time")?;
            snapshot
                .onetime
                .push(OneTimeSlot::from_datetime(at, OneTimeSource::Calendar));
        }
        WakeEdit::RemoveOnce(index) => {
            if index >= snapshot.onetime.len() {
                bail!("no one-time wake at index {index}");
            }
            snapshot.onetime.remove(index);
        }
    }
    Ok(())
}

/// Drop one-time wakes whose minute has passed. The device removes the ones
/// it fired; this catches the ones it missed while offline.
pub fn drop_elapsed(snapshot: &mut ScheduleSnapshot, now: NaiveDateTime) -> usize {
    let cutoff = floor_to_minute(now);
    let before = snapshot.onetime.len();
    snapshot
        .onetime
        .retain(|slot| slot.to_datetime().is_some_and(|at| at >= cutoff));
    before - snapshot.onetime.len()
}

fn ensure_room(len: usize, table: &str) -> anyhow::Result<()> {
    if len >= DEVICE_SLOT_CAPACITY {
        bail!("the device holds at most {DEVICE_SLOT_CAPACITY} {table} wakes");
    }
    Ok(())
}

pub async fn run(action: DeviceAction, ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    let edit = match action {
        DeviceAction::Set { ip, mac } => {
            if ip.is_none() && mac.is_none() {
                bail!("nothing to set: pass --ip and/or --mac");
            }
            store.set_device(ip.as_deref(), mac);
            println!(
                "Device {} will wake {}",
                store.state().device_url().unwrap_or_else(|| "(unset)".into()),
                store
                    .state()
                    .target_mac()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "(unset)".into())
            );
            return Ok(());
        }
        DeviceAction::Show => {
            print_snapshot(&store.state().wake_snapshot());
            return Ok(());
        }
        DeviceAction::Pull => {
            let client = ctx.device_client(store.state())?;
            let snapshot = client.fetch().await?;
            store.replace_wake_schedule(&snapshot);
            println!("Pulled from {}", client.base_url());
            print_snapshot(&snapshot);
            return Ok(());
        }
        DeviceAction::Wake { mac } => {
            let client = ctx.device_client(store.state())?;
            client.wake(mac).await?;
            println!("Magic packet sent");
            return Ok(());
        }
        DeviceAction::WakeName { name } => {
            let client = ctx.device_client(store.state())?;
            client.wake_by_name(&name).await?;
            println!("Magic packet sent to {name}");
            return Ok(());
        }
        DeviceAction::Daily { at, disable } => WakeEdit::Daily {
            at,
            enabled: !disable,
        },
        DeviceAction::WeeklyAdd { weekday, at } => WakeEdit::AddWeekly { weekday, at },
        DeviceAction::WeeklyRemove { index } => WakeEdit::RemoveWeekly(index),
        DeviceAction::OnceAdd { at } => WakeEdit::AddOnce(at),
        DeviceAction::OnceRemove { index } => WakeEdit::RemoveOnce(index),
    };

    let client = ctx.device_client(store.state())?;
    let snapshot = push_edit(&client, &mut store, edit, now()).await?;
    print_snapshot(&snapshot);
    Ok(())
}

/// Fetch the device's schedule, edit it, push it, and adopt the answer.
async fn push_edit(
    client: &DeviceClient,
    store: &mut ScheduleStore,
    edit: WakeEdit,
    now: NaiveDateTime,
) -> anyhow::Result<ScheduleSnapshot> {
    let mac = store.state().target_mac().ok_or(SyncError::NoTargetMac)?;

    let mut snapshot = client.fetch().await?;
    let dropped = drop_elapsed(&mut snapshot, now);
    if dropped > 0 {
        debug!(dropped, "elapsed one-time wakes left out of the push");
    }
    apply_edit(&mut snapshot, edit, now)?;

    let confirmed = client
        .push(&SyncRequest::from_snapshot(mac, &snapshot))
        .await?;
    if confirmed != snapshot {
        eprintln!("note: the device adjusted the schedule; showing what it kept");
    }
    store.replace_wake_schedule(&confirmed);
    Ok(confirmed)
}

fn print_snapshot(snapshot: &ScheduleSnapshot) {
    let d = snapshot.daily;
    println!(
        "Daily:    {:02}:{:02} ({})",
        d.hour,
        d.minute,
        if d.enabled { "on" } else { "off" }
    );
    for (i, w) in snapshot.weekly.iter().enumerate() {
        println!(
            "Weekly {i}: {} {:02}:{:02}",
            weekday_name(w.weekday),
            w.hour,
            w.minute
        );
    }
    for (i, o) in snapshot.onetime.iter().enumerate() {
        println!("Once {i}:   {o}");
    }
}
