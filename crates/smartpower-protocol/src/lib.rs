//! Wire contract between the desktop scheduler and the Wake-on-LAN device.
//!
//! Requests are form-encoded (the device firmware parses flat key/value
//! pairs); responses are JSON [`ScheduleSnapshot`]s. Batch fields are parsed
//! item by item so one malformed entry never discards the rest of a batch.

pub mod endpoints;
pub mod error;
pub mod mac;
pub mod sync;

pub use error::ProtocolError;
pub use mac::MacAddress;
pub use sync::{
    DailyWake, DecodedSync, OneTimeSlot, ScheduleSnapshot, SyncForm, SyncRequest, WeeklySlot,
};
