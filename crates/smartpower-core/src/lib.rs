//! `smartpower-core`: types and configuration shared by the desktop
//! scheduler, the sync protocol and the Wake-on-LAN device.

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

pub use error::{Result, SmartPowerError};
pub use types::{Action, Kind, OneTimeSource};
