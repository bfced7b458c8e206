use axum::{extract::State, Form, Json};
use smartpower_protocol::sync::{WakeByNameForm, WakeForm};
use smartpower_protocol::ScheduleSnapshot;
use std::sync::Arc;
use tracing::info;

use super::{api_error, ApiError};
use crate::app::DeviceState;

/// POST /wol, wake now. Without `mac` the target from the last sync is used.
pub async fn wake(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<WakeForm>,
) -> Result<Json<ScheduleSnapshot>, ApiError> {
    let mac = state
        .resolve_target(form.mac.as_deref())
        .map_err(api_error)?;
    info!(%mac, "forced wake requested");
    state.wake(mac).await.map_err(api_error)?;
    Ok(Json(state.engine().snapshot()))
}

/// POST /wol_by_name
pub async fn wake_by_name(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<WakeByNameForm>,
) -> Result<Json<ScheduleSnapshot>, ApiError> {
    let mac = state.target_by_name(&form.name).map_err(api_error)?;
    info!(name = %form.name, %mac, "wake by name requested");
    state.wake(mac).await.map_err(api_error)?;
    Ok(Json(state.engine().snapshot()))
}
