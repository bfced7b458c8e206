//! `smartpower-device`: the Wake-on-LAN companion device.
//!
//! Holds the wake schedule in fixed slot tables, checks it once a minute
//! against its own clock and broadcasts a magic packet on a match. The
//! desktop pushes and pulls the schedule over the HTTP surface in [`app`].

pub mod app;
pub mod arena;
pub mod clock;
pub mod engine;
pub mod error;
pub mod http;
pub mod remote;
pub mod wol;

pub use app::{build_router, DeviceState};
pub use engine::{DeviceTime, RemoteScheduleEngine, WakeMatch};
pub use error::{DeviceError, Result};
pub use wol::{UdpWakeSender, WakeSender};
