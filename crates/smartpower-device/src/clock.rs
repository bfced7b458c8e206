use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app::DeviceState;
use crate::engine::{DeviceTime, WakeMatch};

const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Device wall clock: UTC shifted by the configured offset.
pub fn device_now(utc_offset_minutes: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + chrono::Duration::minutes(utc_offset_minutes as i64)
}

/// One schedule pass. Sends the packet when a slot matches.
pub async fn check_once(state: &DeviceState, now: NaiveDateTime) -> Option<WakeMatch> {
    let (hit, target) = {
        let mut engine = state.engine();
        (engine.check(&DeviceTime::from_naive(now)), engine.target())
    };
    let hit = hit?;
    match target {
        Some(mac) => {
            info!(kind = %hit.kind, hour = hit.hour, minute = hit.minute, %mac, "scheduled wake");
            if let Err(e) = state.wake(mac).await {
                warn!("scheduled wake failed: {e}");
            }
        }
        None => warn!(kind = %hit.kind, "scheduled wake matched but no target is set"),
    }
    Some(hit)
}

/// Schedule loop. Runs until `shutdown` broadcasts `true`.
pub async fn run(state: Arc<DeviceState>, mut shutdown: watch::Receiver<bool>) {
    let offset = state.config.utc_offset_minutes;
    info!(utc_offset_minutes = offset, "wake schedule loop started");
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                check_once(&state, device_now(offset)).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("wake schedule loop stopped");
                    break;
                }
            }
        }
    }
}
