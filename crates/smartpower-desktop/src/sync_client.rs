//! Desktop side of the device sync protocol.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use smartpower_protocol::sync::{WakeByNameForm, WakeForm};
use smartpower_protocol::{endpoints, MacAddress, ScheduleSnapshot, SyncRequest};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Device address is not configured (use `smartpower device set --ip ...`)")]
    NotConfigured,

    #[error("Target MAC address is not configured (use `smartpower device set --mac ...`)")]
    NoTargetMac,

    #[error("Device request failed: {0}")]
    Network(String),

    #[error("Device answered {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// HTTP client for one device. Every call answers with the device's
/// schedule as it stands afterwards.
#[derive(Clone)]
pub struct DeviceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read-only snapshot.
    pub async fn fetch(&self) -> Result<ScheduleSnapshot> {
        let url = format!("{}{}", self.base_url, endpoints::GET_SCHEDULE);
        debug!(%url, "fetching device schedule");
        let resp = self.client.get(&url).send().await?;
        decode(resp).await
    }

    /// Replace the device's whole wake schedule.
    pub async fn push(&self, request: &SyncRequest) -> Result<ScheduleSnapshot> {
        info!(
            weekly = request.weekly.len(),
            onetime = request.onetime.len(),
            "pushing wake schedule"
        );
        self.post(endpoints::UPDATE_SCHEDULE, &request.to_form()).await
    }

    pub async fn wake(&self, mac: Option<MacAddress>) -> Result<ScheduleSnapshot> {
        let form = WakeForm {
            mac: mac.map(|m| m.to_string()),
        };
        self.post(endpoints::WAKE, &form).await
    }

    pub async fn wake_by_name(&self, name: &str) -> Result<ScheduleSnapshot> {
        let form = WakeByNameForm {
            name: name.to_string(),
        };
        self.post(endpoints::WAKE_BY_NAME, &form).await
    }

    async fn post<F: Serialize>(&self, path: &str, form: &F) -> Result<ScheduleSnapshot> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).form(form).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

/// A real device router on a loopback port, for client tests.
#[cfg(test)]
pub(crate) mod test_device {
    use std::sync::Arc;

    use async_trait::async_trait;
    use smartpower_core::config::DeviceConfig;
    use smartpower_device::{build_router, DeviceState, WakeSender};
    use smartpower_protocol::MacAddress;

    struct Silent;

    #[async_trait]
    impl WakeSender for Silent {
        async fn wake(&self, _mac: MacAddress) -> smartpower_device::Result<()> {
            Ok(())
        }
    }

    /// Returns the base URL and the device state behind it.
    pub async fn spawn() -> (String, Arc<DeviceState>) {
        let state = Arc::new(DeviceState::new(DeviceConfig::default(), Arc::new(Silent)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }
}
