pub mod error;
pub mod listener;
pub mod location_sampler;
pub mod session_tracker;

pub use error::TrackerError;
pub use listener::SessionListener;
pub use location_sampler::{LocationSampler, SamplerConfig};
pub use session_tracker::{SessionSnapshot, SessionTracker, TrackerConfig, TrackerState};
