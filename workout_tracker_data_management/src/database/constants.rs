#![allow(dead_code)]

pub const SESSIONS_TABLE_NAME: &str = "sessions";

pub const ID: &str = "id";
pub const DATE: &str = "date";
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";
pub const HOUR: &str = "hour";
pub const MINUTE: &str = "minute";
pub const DURATION: &str = "duration";
pub const DISTANCE: &str = "distance";
pub const WORKOUT_TYPE: &str = "workout_type";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

pub const MONTHLY_TOTAL: &str = "monthly_total";
