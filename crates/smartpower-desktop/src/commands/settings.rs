use clap::Subcommand;

use super::Context;

pub const DISCLAIMER: &str = "\
SmartPower shuts down and restarts this computer without further notice
once a confirmation countdown runs out. Unsaved work will be lost.
Use it at your own risk.";

#[derive(Subcommand)]
pub enum DebugAction {
    /// Log matches instead of executing them
    On,
    /// Execute matches normally
    Off,
}

pub fn debug(action: DebugAction, ctx: &Context) -> anyhow::Result<()> {
    let enabled = matches!(action, DebugAction::On);
    let mut store = ctx.open_store();
    store.set_debug_mode(enabled);
    if enabled {
        println!("Debug mode on: scheduled actions are logged, not executed");
    } else {
        println!("Debug mode off");
    }
    Ok(())
}

pub fn accept_disclaimer(ctx: &Context) -> anyhow::Result<()> {
    let mut store = ctx.open_store();
    if store.state().disclaimer_accepted {
        println!("Disclaimer already accepted");
        return Ok(());
    }
    println!("{DISCLAIMER}");
    store.accept_disclaimer();
    println!("Accepted.");
    Ok(())
}
