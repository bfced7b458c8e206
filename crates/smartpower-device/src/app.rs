use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    routing::{get, post},
    Router,
};
use smartpower_core::config::{DeviceConfig, WakeTarget};
use smartpower_protocol::{endpoints, MacAddress};

use crate::engine::RemoteScheduleEngine;
use crate::error::{DeviceError, Result};
use crate::wol::WakeSender;

/// Shared device state, passed as `Arc<DeviceState>` to handlers and loops.
pub struct DeviceState {
    pub config: DeviceConfig,
    engine: Mutex<RemoteScheduleEngine>,
    pub sender: Arc<dyn WakeSender>,
}

impl DeviceState {
    pub fn new(config: DeviceConfig, sender: Arc<dyn WakeSender>) -> Self {
        Self {
            config,
            engine: Mutex::new(RemoteScheduleEngine::new()),
            sender,
        }
    }

    /// Lock the engine. Never hold the guard across an `.await`.
    pub fn engine(&self) -> MutexGuard<'_, RemoteScheduleEngine> {
        self.engine.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `explicit` if given, else the MAC from the last sync.
    pub fn resolve_target(&self, explicit: Option<&str>) -> Result<MacAddress> {
        match explicit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Ok(raw.parse()?),
            None => self.engine().target().ok_or(DeviceError::NoTarget),
        }
    }

    /// Look up a configured target by name (case-insensitive).
    pub fn target_by_name(&self, name: &str) -> Result<MacAddress> {
        let target: &WakeTarget = self
            .config
            .targets
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| DeviceError::UnknownTarget(name.to_string()))?;
        Ok(target.mac.parse()?)
    }

    pub async fn wake(&self, mac: MacAddress) -> Result<()> {
        self.sender.wake(mac).await
    }
}

/// Assemble the device router.
pub fn build_router(state: Arc<DeviceState>) -> Router {
    use crate::http::{health, schedule, wake};

    Router::new()
        .route(endpoints::HEALTH, get(health::health_handler))
        .route(endpoints::GET_SCHEDULE, get(schedule::get_schedule))
        .route(endpoints::UPDATE_SCHEDULE, post(schedule::update_schedule))
        .route(endpoints::UPDATE_DAILY, post(schedule::update_daily))
        .route(endpoints::ADD_WEEKLY, post(schedule::add_weekly))
        .route(endpoints::DELETE_WEEKLY, post(schedule::delete_weekly))
        .route(endpoints::ADD_ONETIME, post(schedule::add_onetime))
        .route(endpoints::DELETE_ONETIME, post(schedule::delete_onetime))
        .route(endpoints::WAKE, post(wake::wake))
        .route(endpoints::WAKE_BY_NAME, post(wake::wake_by_name))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
