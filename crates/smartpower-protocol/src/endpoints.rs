// Device HTTP routes. Paths are fixed by the device firmware.

// bulk sync
pub const GET_SCHEDULE: &str = "/get_schedule";
pub const UPDATE_SCHEDULE: &str = "/update_schedule";

// single-entry edits
pub const UPDATE_DAILY: &str = "/update_daily";
pub const ADD_WEEKLY: &str = "/add_weekly";
pub const DELETE_WEEKLY: &str = "/delete_weekly";
pub const ADD_ONETIME: &str = "/add_onetime";
pub const DELETE_ONETIME: &str = "/delete_onetime";

// immediate wake
pub const WAKE: &str = "/wol";
pub const WAKE_BY_NAME: &str = "/wol_by_name";

pub const HEALTH: &str = "/health";
