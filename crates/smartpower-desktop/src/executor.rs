use std::process::Command;

use smartpower_core::ports::{ActionExecutor, DisplayHint};
use smartpower_core::{Action, Result, SmartPowerError};
use tracing::{debug, info};

/// Runs the platform `shutdown` command.
pub struct OsExecutor;

/// Program and arguments for `action` on the current platform.
pub fn command_for(action: Action) -> Result<(&'static str, &'static [&'static str])> {
    let args: &'static [&'static str] = match (action, cfg!(windows)) {
        (Action::Shutdown, true) => &["/s", "/t", "0"],
        (Action::Restart, true) => &["/r", "/t", "0"],
        (Action::Shutdown, false) => &["-h", "now"],
        (Action::Restart, false) => &["-r", "now"],
        (Action::Wake, _) => {
            return Err(SmartPowerError::Executor(
                "wake is carried out by the device".to_string(),
            ))
        }
    };
    Ok(("shutdown", args))
}

fn abort_args() -> &'static [&'static str] {
    if cfg!(windows) {
        &["/a"]
    } else {
        &["-c"]
    }
}

fn run(program: &str, args: &[&str]) -> Result<()> {
    debug!(program, ?args, "spawning");
    let status = Command::new(program).args(args).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(SmartPowerError::Executor(format!(
            "{program} {} exited with {status}",
            args.join(" ")
        )))
    }
}

impl ActionExecutor for OsExecutor {
    fn execute(&self, action: Action) -> Result<()> {
        let (program, args) = command_for(action)?;
        info!(%action, "invoking OS power action");
        run(program, args)
    }

    fn abort_pending(&self) -> Result<()> {
        run("shutdown", abort_args())
    }
}

/// Display hint that only records the request. Keeping the screen on is
/// left to the desktop environment.
pub struct LogDisplayHint;

impl DisplayHint for LogDisplayHint {
    fn keep_display_awake(&self) {
        debug!("display wake requested");
    }

    fn reset_power_state(&self) {
        debug!("power state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_has_no_local_command() {
        assert!(command_for(Action::Wake).is_err());
    }

    #[test]
    fn local_actions_map_to_shutdown() {
        let (program, args) = command_for(Action::Restart).unwrap();
        assert_eq!(program, "shutdown");
        if cfg!(windows) {
            assert_eq!(args, &["/r", "/t", "0"]);
        } else {
            assert_eq!(args, &["-r", "now"]);
        }
    }
}
