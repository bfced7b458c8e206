pub mod health;
pub mod schedule;
pub mod wake;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::DeviceError;

pub type ApiError = (StatusCode, Json<Value>);

/// Map a device error onto an HTTP status and a JSON body.
pub(crate) fn api_error(e: DeviceError) -> ApiError {
    let status = match &e {
        DeviceError::Full { .. }
        | DeviceError::Invalid(_)
        | DeviceError::IndexOutOfRange { .. }
        | DeviceError::Protocol(_) => StatusCode::BAD_REQUEST,
        DeviceError::NoTarget => StatusCode::CONFLICT,
        DeviceError::UnknownTarget(_) => StatusCode::NOT_FOUND,
        DeviceError::Network(_) | DeviceError::Io(_) => StatusCode::BAD_GATEWAY,
    };
    warn!(code = e.code(), "request failed: {e}");
    (
        status,
        Json(json!({ "error": e.to_string(), "code": e.code() })),
    )
}
