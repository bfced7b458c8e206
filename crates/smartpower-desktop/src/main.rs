mod commands;
mod executor;
mod sync_client;

use clap::{Parser, Subcommand};
use smartpower_core::config::SmartPowerConfig;
use tracing::warn;

use commands::daemon;
use commands::device::{self, DeviceAction};
use commands::schedule::{self, DailyAction, OnceAction, SkipAction, WeeklyAction};
use commands::settings::{self, DebugAction};
use commands::Context;

#[derive(Parser)]
#[command(name = "smartpower", about = "Scheduled shutdown, restart and Wake-on-LAN")]
#[command(version)]
struct Cli {
    /// Config file (default: $SMARTPOWER_CONFIG, then ~/.smartpower/smartpower.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler in the foreground
    Run,
    /// Show the next event and settings
    Status,
    /// List every schedule entry
    List,
    /// Daily shutdown/restart
    Daily {
        #[command(subcommand)]
        action: DailyAction,
    },
    /// Weekly entries
    Weekly {
        #[command(subcommand)]
        action: WeeklyAction,
    },
    /// One-time entries
    Once {
        #[command(subcommand)]
        action: OnceAction,
    },
    /// Skip single occurrences of daily/weekly entries
    Skip {
        #[command(subcommand)]
        action: SkipAction,
    },
    /// Wake-on-LAN companion device
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Debug mode: log matches without executing them
    Debug {
        #[command(subcommand)]
        action: DebugAction,
    },
    /// Accept the usage disclaimer (required before `run`)
    AcceptDisclaimer,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartpower_desktop=info,smartpower_scheduler=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SMARTPOWER_CONFIG").ok());
    let config = match SmartPowerConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SmartPowerConfig::default()
        }
    };
    let ctx = Context::new(config.desktop);

    match cli.command {
        Command::Run => daemon::run(&ctx).await,
        Command::Status => schedule::status(&ctx),
        Command::List => schedule::list(&ctx),
        Command::Daily { action } => schedule::daily(action, &ctx),
        Command::Weekly { action } => schedule::weekly(action, &ctx),
        Command::Once { action } => schedule::once(action, &ctx),
        Command::Skip { action } => schedule::skip(action, &ctx),
        Command::Device { action } => device::run(action, &ctx).await,
        Command::Debug { action } => settings::debug(action, &ctx),
        Command::AcceptDisclaimer => settings::accept_disclaimer(&ctx),
    }
}
