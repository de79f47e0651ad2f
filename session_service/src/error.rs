use thiserror::Error;

use workout_tracker_data_management::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("a session is already running")]
    AlreadyStarted,
    #[error("cannot {operation} a session that is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("the session is already terminated")]
    AlreadyTerminated,
    #[error("failed to persist completed session: {0}")]
    Persistence(#[from] StoreError),
}
