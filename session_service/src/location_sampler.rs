use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use workout_tracker_lib::location_fix::{LocationFix, haversine_distance};

use crate::session_tracker::SessionTracker;

/// Thresholds applied to raw fixes before they reach the tracker, matching
/// the minimum interval and displacement requested from the platform
/// location source.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub min_update_interval: Duration,
    pub min_update_distance_m: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_update_interval: Duration::from_millis(200),
            min_update_distance_m: 2.0,
        }
    }
}

/// Filters a raw stream of fixes down to the ones worth processing.
#[derive(Debug)]
pub struct LocationSampler {
    config: SamplerConfig,
    last_forwarded: Option<LocationFix>,
}

impl LocationSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            last_forwarded: None,
        }
    }

    /// Returns the fix when it passes both thresholds relative to the last
    /// forwarded one. The first fix always passes.
    pub fn sample(&mut self, fix: LocationFix) -> Option<LocationFix> {
        if let Some(last) = self.last_forwarded {
            let elapsed_ms = fix.timestamp_ms.saturating_sub(last.timestamp_ms);
            if elapsed_ms < self.config.min_update_interval.as_millis() as u64 {
                return None;
            }
            if haversine_distance(last.position, fix.position) < self.config.min_update_distance_m {
                return None;
            }
        }
        self.last_forwarded = Some(fix);
        Some(fix)
    }

    /// Forwards accepted fixes to the tracker until the source closes or the
    /// session stops, whichever comes first; a stopped session releases the
    /// subscription without waiting for another fix. A source that never
    /// produces a fix is fine; the session simply accumulates no distance.
    pub async fn run(mut self, mut source: mpsc::Receiver<LocationFix>, tracker: Arc<SessionTracker>) {
        let mut stop_signal = tracker.stop_signal();
        loop {
            tokio::select! {
                maybe_fix = source.recv() => {
                    let Some(fix) = maybe_fix else { break };
                    if let Some(fix) = self.sample(fix) {
                        tracker.process_fix(fix).await;
                    }
                }
                _ = async {
                    let _ = stop_signal.wait_for(|stopped| *stopped).await;
                } => break,
            }
        }
        debug!("location subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workout_tracker_data_management::SessionStore;
    use workout_tracker_lib::workout_type::WorkoutType;

    use crate::session_tracker::TrackerConfig;

    #[test]
    fn first_fix_always_passes() {
        let mut sampler = LocationSampler::new(SamplerConfig::default());
        assert!(sampler.sample(LocationFix::new(0.0, 0.0, 0)).is_some());
    }

    #[test]
    fn fixes_below_either_threshold_are_dropped() {
        let mut sampler = LocationSampler::new(SamplerConfig::default());
        sampler.sample(LocationFix::new(0.0, 0.0, 0));

        // Far enough but too soon.
        assert!(sampler.sample(LocationFix::new(0.0, 0.001, 100)).is_none());
        // Late enough but barely moved (about 1.1 m).
        assert!(sampler.sample(LocationFix::new(0.0, 0.00001, 500)).is_none());
        // Both thresholds met.
        assert!(sampler.sample(LocationFix::new(0.0, 0.001, 500)).is_some());
    }

    #[test]
    fn dropped_fixes_do_not_move_the_reference() {
        let mut sampler = LocationSampler::new(SamplerConfig::default());
        sampler.sample(LocationFix::new(0.0, 0.0, 0));
        assert!(sampler.sample(LocationFix::new(0.0, 0.001, 100)).is_none());
        // Still measured against the fix at t=0.
        assert!(sampler.sample(LocationFix::new(0.0, 0.001, 250)).is_some());
    }

    #[tokio::test]
    async fn run_forwards_accepted_fixes_until_the_source_closes() {
        let store = SessionStore::open_in_memory().await.unwrap();
        let tracker = Arc::new(SessionTracker::new(store, TrackerConfig::default()));
        tracker.start(WorkoutType::Running).await.unwrap();

        let (fix_tx, fix_rx) = mpsc::channel(8);
        let sampler = LocationSampler::new(SamplerConfig::default());
        let forwarding = tokio::spawn(sampler.run(fix_rx, Arc::clone(&tracker)));

        fix_tx.send(LocationFix::new(0.0, 0.0, 0)).await.unwrap();
        fix_tx.send(LocationFix::new(0.0, 0.0005, 100)).await.unwrap(); // too soon
        fix_tx.send(LocationFix::new(0.0, 0.001, 1_000)).await.unwrap();
        drop(fix_tx);
        forwarding.await.unwrap();

        assert_eq!(tracker.snapshot().await.distance_m, 111);
    }

    #[tokio::test]
    async fn stopping_the_session_releases_the_subscription() {
        let store = SessionStore::open_in_memory().await.unwrap();
        let tracker = Arc::new(SessionTracker::new(store, TrackerConfig::default()));
        tracker.start(WorkoutType::Running).await.unwrap();

        let (fix_tx, fix_rx) = mpsc::channel(8);
        let sampler = LocationSampler::new(SamplerConfig::default());
        let forwarding = tokio::spawn(sampler.run(fix_rx, Arc::clone(&tracker)));

        tracker.stop().await.unwrap();

        // The forwarding task must exit without another fix arriving and
        // without the channel closing.
        tokio::time::timeout(Duration::from_secs(1), forwarding)
            .await
            .expect("forwarding task should exit when the session stops")
            .unwrap();
        drop(fix_tx);
    }
}
