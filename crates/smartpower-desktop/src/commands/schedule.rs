use anyhow::Context as _;
use chrono::NaiveDateTime;
use clap::Subcommand;
use smartpower_core::types::{format_slot, weekday_name};
use smartpower_core::{Action, OneTimeSource};
use smartpower_scheduler::{upcoming, ScheduleState, ScheduleStore};

use super::{now, slot_arg, weekday_arg, Context, TimeOfDay};

#[derive(Subcommand)]
pub enum DailyAction {
    /// Enable the daily slot for an action
    Set {
        /// shutdown | restart
        action: Action,
        /// Time of day, HH:MM
        at: TimeOfDay,
    },
    /// Disable the daily slot (its time is kept)
    Disable { action: Action },
}

#[derive(Subcommand)]
pub enum WeeklyAction {
    /// Add a weekly entry
    Add {
        action: Action,
        /// 0-6 (0 = Monday) or a weekday name
        #[arg(value_parser = weekday_arg)]
        weekday: u8,
        at: TimeOfDay,
    },
    /// Remove a weekly entry by ID
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum OnceAction {
    /// Run an action once at a given local time
    At {
        action: Action,
        /// "YYYY-MM-DD HH:MM"
        #[arg(value_parser = slot_arg)]
        at: NaiveDateTime,
    },
    /// Run an action once, N hours from now
    In { action: Action, hours: u32 },
    /// Remove a one-time entry by ID
    Remove { id: String },
    /// Remove every executed one-time entry
    Clear,
}

#[derive(Subcommand)]
pub enum SkipAction {
    /// Suppress one occurrence, given as "YYYY-MM-DD HH:MM"
    Add {
        #[arg(value_parser = slot_arg)]
        at: NaiveDateTime,
    },
    /// Remove a skip marker
    Remove {
        #[arg(value_parser = slot_arg)]
        at: NaiveDateTime,
    },
    /// List skip markers
    List,
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store();
    let state = store.state();
    let now = now();

    match upcoming(state, &Action::LOCAL, now).first() {
        Some(next) => println!("Next event:   {next}"),
        None => println!("Next event:   none"),
    }
    println!("Debug mode:   {}", on_off(state.debug_mode));
    let disclaimer = if state.disclaimer_accepted {
        "accepted"
    } else {
        "not accepted"
    };
    println!("Disclaimer:   {disclaimer}");
    println!(
        "Device:       {}",
        state.device_url().unwrap_or_else(|| "not configured".to_string())
    );
    match state.target_mac() {
        Some(mac) => println!("Wake target:  {mac}"),
        None => println!("Wake target:  not configured"),
    }
    if store.load_failed() {
        println!("WARNING: state file failed to load; changes are not saved");
    }
    Ok(())
}

pub fn list(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store();
    print_schedule(store.state(), now());
    Ok(())
}

fn print_schedule(state: &ScheduleState, now: NaiveDateTime) {
    println!("Daily:");
    for action in Action::LOCAL {
        let d = state.daily(action);
        println!(
            "  {:<9} {:02}:{:02} {}",
            action.as_str(),
            d.hour,
            d.minute,
            on_off(d.enabled)
        );
    }

    println!("Weekly:");
    if state.weekly_schedules.is_empty() {
        println!("  (none)");
    }
    for w in &state.weekly_schedules {
        println!("  {}  {w}", w.id);
    }

    println!("One-time:");
    if state.onetime.is_empty() {
        println!("  (none)");
    }
    for o in &state.onetime {
        println!("  {}  {o} [{}]", o.id, o.source);
    }

    if !state.skipped_dates.is_empty() {
        println!("Skipped:");
        for s in &state.skipped_dates {
            println!("  {s}");
        }
    }

    println!("Wake (device cache):");
    let d = state.wake_daily;
    println!("  daily     {:02}:{:02} {}", d.hour, d.minute, on_off(d.enabled));
    for (i, w) in state.wake_weekly.iter().enumerate() {
        println!(
            "  weekly[{i}] every {} at {:02}:{:02}",
            weekday_name(w.weekday),
            w.hour,
            w.minute
        );
    }
    for (i, o) in state.wake_onetime.iter().enumerate() {
        let at = o
            .to_datetime()
            .map(format_slot)
            .unwrap_or_else(|| o.to_string());
        println!("  once[{i}]   {at} [{}]", o.source);
    }

    let next: Vec<_> = upcoming(state, &Action::LOCAL, now)
        .into_iter()
        .take(5)
        .collect();
    if !next.is_empty() {
        println!("Upcoming:");
        for ev in next {
            println!("  {ev}");
        }
    }
}

pub fn daily(action: DailyAction, ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    match action {
        DailyAction::Set { action, at } => {
            store.set_daily(action, true, at.hour, at.minute)?;
            println!("Daily {action} set to {at}");
        }
        DailyAction::Disable { action } => {
            let current = store.state().daily(action);
            store.set_daily(action, false, current.hour, current.minute)?;
            println!("Daily {action} disabled");
        }
    }
    Ok(())
}

pub fn weekly(action: WeeklyAction, ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    match action {
        WeeklyAction::Add {
            action,
            weekday,
            at,
        } => {
            let entry = store.add_weekly(action, weekday, at.hour, at.minute)?;
            println!("Added {} ({entry})", entry.id);
        }
        WeeklyAction::Remove { id } => {
            let entry = store.remove_weekly(&id)?;
            println!("Removed {entry}");
        }
    }
    Ok(())
}

pub fn once(action: OnceAction, ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    match action {
        OnceAction::At { action, at } => {
            let entry = store.add_onetime(action, at, OneTimeSource::Calendar, now())?;
            println!("Added {} ({entry})", entry.id);
        }
        OnceAction::In { action, hours } => {
            let entry = store.add_onetime_in_hours(action, hours, now())?;
            println!("Added {} ({entry})", entry.id);
        }
        OnceAction::Remove { id } => {
            let entry = store.remove_onetime(&id)?;
            println!("Removed {entry}");
        }
        OnceAction::Clear => {
            let n = store.clear_executed();
            println!("Cleared {n} executed entr{}", if n == 1 { "y" } else { "ies" });
        }
    }
    Ok(())
}

pub fn skip(action: SkipAction, ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    match action {
        SkipAction::Add { at } => {
            if at <= now() {
                anyhow::bail!("{} is in the past", format_slot(at));
            }
            warn_if_unscheduled(&store, at);
            if store.add_skip(at) {
                println!("Skipping {}", format_slot(at));
            } else {
                println!("{} is already skipped", format_slot(at));
            }
        }
        SkipAction::Remove { at } => {
            store
                .remove_skip(at)
                .then_some(())
                .with_context(|| format!("{} is not skipped", format_slot(at)))?;
            println!("No longer skipping {}", format_slot(at));
        }
        SkipAction::List => {
            for s in &store.state().skipped_dates {
                println!("{s}");
            }
        }
    }
    Ok(())
}

/// A marker on a minute nothing recurs at has no effect; say so.
fn warn_if_unscheduled(store: &ScheduleStore, at: NaiveDateTime) {
    use chrono::Timelike;
    use smartpower_core::types::weekday_index;

    let state = store.state();
    let (h, m) = (at.hour() as u8, at.minute() as u8);
    let recurring = Action::LOCAL.into_iter().any(|a| {
        let d = state.daily(a);
        d.enabled && d.hour == h && d.minute == m
    }) || state
        .weekly_schedules
        .iter()
        .any(|w| w.weekday == weekday_index(&at) && w.hour == h && w.minute == m);
    if !recurring {
        eprintln!("note: no daily or weekly entry runs at {}", format_slot(at));
    }
}

fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}
