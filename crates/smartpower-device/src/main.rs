use std::net::SocketAddr;
use std::sync::Arc;

use smartpower_core::config::SmartPowerConfig;
use smartpower_device::remote::RemoteTrigger;
use smartpower_device::{build_router, clock, DeviceState, UdpWakeSender};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("SMARTPOWER_CONFIG").ok();
    let loaded = SmartPowerConfig::load(config_path.as_deref());
    let device = loaded
        .as_ref()
        .map(|c| c.device.clone())
        .unwrap_or_default();

    let default_filter = if device.debug {
        "smartpower_device=debug,tower_http=debug"
    } else {
        "smartpower_device=info,tower_http=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Err(e) = &loaded {
        warn!("Config load failed ({}), using defaults", e);
    }
    if let Some(ntp) = &device.ntp_server {
        info!(server = %ntp, "clock expected to be synced by the host");
    }

    let addr: SocketAddr = format!("{}:{}", device.bind, device.port).parse()?;
    let sender = Arc::new(UdpWakeSender::new(device.broadcast_addr.clone()));
    let remote = device.remote_trigger.clone();
    let state = Arc::new(DeviceState::new(device, sender));
    let router = build_router(state.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(clock::run(Arc::clone(&state), shutdown_rx.clone()));

    match remote.as_ref().map(RemoteTrigger::new) {
        Some(Ok(trigger)) => {
            tokio::spawn(trigger.run(Arc::clone(&state), shutdown_rx));
        }
        Some(Err(e)) => warn!("remote trigger disabled: {e}"),
        None => {}
    }

    info!("SmartPower device listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}
