pub mod formatter;
pub mod location_fix;
pub mod workout_session;
pub mod workout_type;
