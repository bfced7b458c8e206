//! Schedule endpoints. Every one answers with the full snapshot so the
//! desktop can replace its cache with what the device actually holds.

use axum::{extract::State, Form, Json};
use smartpower_protocol::sync::{decode_daily, DailyForm, IndexForm};
use smartpower_protocol::{OneTimeSlot, ScheduleSnapshot, SyncForm, WeeklySlot};
use std::sync::Arc;

use super::{api_error, ApiError};
use crate::app::DeviceState;
use crate::error::DeviceError;

type SnapshotResult = Result<Json<ScheduleSnapshot>, ApiError>;

/// GET /get_schedule, read-only.
pub async fn get_schedule(State(state): State<Arc<DeviceState>>) -> Json<ScheduleSnapshot> {
    Json(state.engine().snapshot())
}

/// POST /update_schedule, bulk replacement. Malformed items are dropped and
/// the rest applied.
pub async fn update_schedule(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<SyncForm>,
) -> Json<ScheduleSnapshot> {
    let mut engine = state.engine();
    engine.apply_sync(form.decode());
    Json(engine.snapshot())
}

/// POST /update_daily
pub async fn update_daily(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<DailyForm>,
) -> SnapshotResult {
    let daily = decode_daily(&form.d_en, &form.d_h, &form.d_m)
        .map_err(|e| api_error(e.into()))?
        .ok_or_else(|| api_error(DeviceError::Invalid("daily fields missing".into())))?;
    let mut engine = state.engine();
    engine.set_daily(daily).map_err(api_error)?;
    Ok(Json(engine.snapshot()))
}

/// POST /add_weekly
pub async fn add_weekly(
    State(state): State<Arc<DeviceState>>,
    Form(slot): Form<WeeklySlot>,
) -> SnapshotResult {
    let mut engine = state.engine();
    engine.add_weekly(slot).map_err(api_error)?;
    Ok(Json(engine.snapshot()))
}

/// POST /delete_weekly
pub async fn delete_weekly(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<IndexForm>,
) -> SnapshotResult {
    let mut engine = state.engine();
    engine.delete_weekly(form.index).map_err(api_error)?;
    Ok(Json(engine.snapshot()))
}

/// POST /add_onetime
pub async fn add_onetime(
    State(state): State<Arc<DeviceState>>,
    Form(slot): Form<OneTimeSlot>,
) -> SnapshotResult {
    let now = crate::clock::device_now(state.config.utc_offset_minutes);
    let mut engine = state.engine();
    engine.add_onetime(slot, now).map_err(api_error)?;
    Ok(Json(engine.snapshot()))
}

/// POST /delete_onetime
pub async fn delete_onetime(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<IndexForm>,
) -> SnapshotResult {
    let mut engine = state.engine();
    engine.delete_onetime(form.index).map_err(api_error)?;
    Ok(Json(engine.snapshot()))
}
