//! On-demand wake requests relayed through a remote URL (for example a
//! chat-bot script). The relay answers `{"wake": true, "target": "desk"}`
//! when a wake is wanted; `target` is optional.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use smartpower_core::config::{RemoteTriggerConfig, SYNC_TIMEOUT_SECS};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app::DeviceState;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteCommand {
    #[serde(default)]
    pub wake: bool,
    #[serde(default)]
    pub target: Option<String>,
}

pub struct RemoteTrigger {
    client: reqwest::Client,
    url: String,
    poll: Duration,
}

impl RemoteTrigger {
    pub fn new(config: &RemoteTriggerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SYNC_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            poll: Duration::from_secs(config.poll_secs.max(1)),
        })
    }

    pub async fn fetch(&self) -> Result<RemoteCommand> {
        let command = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<RemoteCommand>()
            .await?;
        Ok(command)
    }

    /// Act on one command. Returns whether a packet was sent.
    pub async fn handle(state: &DeviceState, command: RemoteCommand) -> Result<bool> {
        if !command.wake {
            return Ok(false);
        }
        let mac = match command.target.as_deref() {
            Some(name) => state.target_by_name(name)?,
            None => state.resolve_target(None)?,
        };
        info!(%mac, target = ?command.target, "remote wake requested");
        state.wake(mac).await?;
        Ok(true)
    }

    /// Poll until `shutdown` broadcasts `true`. Failures are logged and the
    /// next poll proceeds as usual.
    pub async fn run(self, state: Arc<DeviceState>, mut shutdown: watch::Receiver<bool>) {
        info!(url = %self.url, every_secs = self.poll.as_secs(), "remote trigger polling started");
        let mut interval = tokio::time::interval(self.poll);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = match self.fetch().await {
                        Ok(command) => Self::handle(&state, command).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = outcome {
                        warn!("remote trigger poll failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("remote trigger polling stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::wol::WakeSender;
    use async_trait::async_trait;
    use smartpower_core::config::{DeviceConfig, WakeTarget};
    use smartpower_protocol::MacAddress;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<MacAddress>>);

    #[async_trait]
    impl WakeSender for Recorder {
        async fn wake(&self, mac: MacAddress) -> Result<()> {
            self.0.lock().unwrap().push(mac);
            Ok(())
        }
    }

    fn state(recorder: Arc<Recorder>) -> DeviceState {
        let config = DeviceConfig {
            targets: vec![WakeTarget {
                name: "desk".into(),
                mac: "11:22:33:44:55:66".into(),
            }],
            ..DeviceConfig::default()
        };
        DeviceState::new(config, recorder)
    }

    #[test]
    fn command_shape() {
        let cmd: RemoteCommand = serde_json::from_str(r#"{"wake":true,"target":"desk"}"#).unwrap();
        assert!(cmd.wake);
        assert_eq!(cmd.target.as_deref(), Some("desk"));
        let idle: RemoteCommand = serde_json::from_str("{}").unwrap();
        assert_eq!(idle, RemoteCommand::default());
    }

    #[tokio::test]
    async fn named_and_default_targets() {
        let recorder = Arc::new(Recorder::default());
        let state = state(recorder.clone());

        let idle = RemoteTrigger::handle(&state, RemoteCommand::default()).await;
        assert!(!idle.unwrap());

        let err = RemoteTrigger::handle(
            &state,
            RemoteCommand {
                wake: true,
                target: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeviceError::NoTarget));

        let sent = RemoteTrigger::handle(
            &state,
            RemoteCommand {
                wake: true,
                target: Some("Desk".into()),
            },
        )
        .await
        .unwrap();
        assert!(sent);
        assert_eq!(
            recorder.0.lock().unwrap()[0].to_string(),
            "11:22:33:44:55:66"
        );
    }
}
