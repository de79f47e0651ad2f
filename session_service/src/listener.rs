use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

/// Receives live updates from the ongoing session. All callbacks default to
/// no-ops, so a consumer implements only the ones it cares about.
pub trait SessionListener: Send + Sync {
    fn on_duration_updated(&self, _duration_ms: u64) {}
    fn on_distance_updated(&self, _distance_m: u64) {}
    fn on_pace_updated(&self, _metres_per_second: f64) {}
    fn on_location_updated(&self, _latitude: f64, _longitude: f64) {}
}

/// One update fanned out to the registered listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SessionEvent {
    Duration(u64),
    Distance(u64),
    Pace(f64),
    Location { latitude: f64, longitude: f64 },
}

/// Delivers the event to one listener. A panicking listener is contained so
/// it cannot take down the tracker or starve the listeners after it.
pub(crate) fn notify_one(listener: &Arc<dyn SessionListener>, event: SessionEvent) {
    let delivery = catch_unwind(AssertUnwindSafe(|| match event {
        SessionEvent::Duration(duration_ms) => listener.on_duration_updated(duration_ms),
        SessionEvent::Distance(distance_m) => listener.on_distance_updated(distance_m),
        SessionEvent::Pace(pace_mps) => listener.on_pace_updated(pace_mps),
        SessionEvent::Location { latitude, longitude } => {
            listener.on_location_updated(latitude, longitude)
        }
    }));
    if delivery.is_err() {
        warn!("session listener panicked during {event:?} notification");
    }
}

/// Notifies every listener in registration order.
pub(crate) fn notify_all(listeners: &[Arc<dyn SessionListener>], event: SessionEvent) {
    for listener in listeners {
        notify_one(listener, event);
    }
}
