use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, Timelike};
use geo_types::Point;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use workout_tracker_data_management::SessionStore;
use workout_tracker_lib::{
    location_fix::{LocationFix, haversine_distance},
    workout_session::{WorkoutSession, join_coordinates},
    workout_type::WorkoutType,
};

use crate::error::TrackerError;
use crate::listener::{SessionEvent, SessionListener, notify_all, notify_one};

/// Timing parameters of the live tracking engine.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// How often the duration accumulator advances.
    pub tick_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
        }
    }
}

/// Lifecycle of a tracked session. Terminated is final; a new session needs
/// a new tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Active,
    Paused,
    Terminated,
}

impl TrackerState {
    fn name(self) -> &'static str {
        match self {
            TrackerState::Idle => "idle",
            TrackerState::Active => "active",
            TrackerState::Paused => "paused",
            TrackerState::Terminated => "terminated",
        }
    }
}

/// A consistent view of the live accumulators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub state: TrackerState,
    pub elapsed_duration_ms: u64,
    pub distance_m: u64,
    pub current_pace_mps: f64,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    position: Point<f64>,
    timestamp_ms: u64,
}

struct TrackerInner {
    state: TrackerState,
    workout_type: WorkoutType,
    start_date: u32,
    start_month: u32,
    start_year: i32,
    start_hour: u32,
    start_minute: u32,
    elapsed_duration_ms: u64,
    distance_m: u64,
    current_pace_mps: f64,
    track: Vec<Point<f64>>,
    anchor: Option<Anchor>,
    previous_tick: Instant,
    listeners: Vec<Arc<dyn SessionListener>>,
    ticker: Option<JoinHandle<()>>,
}

impl TrackerInner {
    fn new() -> Self {
        Self {
            state: TrackerState::Idle,
            workout_type: WorkoutType::default(),
            start_date: 0,
            start_month: 0,
            start_year: 0,
            start_hour: 0,
            start_minute: 0,
            elapsed_duration_ms: 0,
            distance_m: 0,
            current_pace_mps: 0.0,
            track: Vec::new(),
            anchor: None,
            previous_tick: Instant::now(),
            listeners: Vec::new(),
            ticker: None,
        }
    }

    /// Advances the duration accumulator by the time since the last tick.
    /// The tick baseline moves even while paused, so resuming never charges
    /// the paused interval to the session.
    fn apply_tick(&mut self, now: Instant) {
        let delta_ms = now.saturating_duration_since(self.previous_tick).as_millis() as u64;
        self.previous_tick = now;
        if self.state == TrackerState::Active {
            self.elapsed_duration_ms += delta_ms;
            notify_all(&self.listeners, SessionEvent::Duration(self.elapsed_duration_ms));
        }
    }

    /// Folds one accepted fix into the accumulators. The first fix only
    /// seeds the baseline. While paused, nothing accumulates but the
    /// baseline keeps following the latest fix, so pace after resuming is
    /// computed against fresh data rather than a stale point.
    fn apply_fix(&mut self, fix: LocationFix) {
        if matches!(self.state, TrackerState::Idle | TrackerState::Terminated) {
            return;
        }

        if let Some(anchor) = self.anchor {
            if self.state == TrackerState::Active {
                let delta_m = haversine_distance(anchor.position, fix.position).round() as u64;
                let elapsed_s = fix.timestamp_ms.saturating_sub(anchor.timestamp_ms) as f64 / 1_000.0;
                self.distance_m += delta_m;
                self.current_pace_mps = if elapsed_s > 0.0 {
                    delta_m as f64 / elapsed_s
                } else {
                    0.0
                };
                self.track.push(anchor.position);

                notify_all(&self.listeners, SessionEvent::Distance(self.distance_m));
                notify_all(&self.listeners, SessionEvent::Pace(self.current_pace_mps));
            }
            // Raw positions are reported even while paused, so a following
            // map view keeps up with the wearer.
            notify_all(
                &self.listeners,
                SessionEvent::Location {
                    latitude: fix.latitude(),
                    longitude: fix.longitude(),
                },
            );
        }

        self.anchor = Some(Anchor {
            position: fix.position,
            timestamp_ms: fix.timestamp_ms,
        });
    }

    fn completed_session(&self) -> WorkoutSession {
        let latitudes: Vec<f64> = self.track.iter().map(|point| point.y()).collect();
        let longitudes: Vec<f64> = self.track.iter().map(|point| point.x()).collect();
        WorkoutSession {
            id: 0,
            date: self.start_date,
            month: self.start_month,
            year: self.start_year,
            hour: self.start_hour,
            minute: self.start_minute,
            duration_ms: self.elapsed_duration_ms as i64,
            distance_m: self.distance_m as i64,
            workout_type: self.workout_type,
            latitudes: join_coordinates(&latitudes),
            longitudes: join_coordinates(&longitudes),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            elapsed_duration_ms: self.elapsed_duration_ms,
            distance_m: self.distance_m,
            current_pace_mps: self.current_pace_mps,
        }
    }
}

/// Tracks one live workout session: lifecycle, accumulators and listener
/// fan-out, with the completed session persisted on stop.
///
/// All mutation and notification happens under a single lock, so listeners
/// always observe values in update order and no notification is delivered
/// after [`stop`](Self::stop) returns.
pub struct SessionTracker {
    inner: Arc<Mutex<TrackerInner>>,
    store: SessionStore,
    config: TrackerConfig,
    shutdown: watch::Sender<bool>,
}

impl SessionTracker {
    pub fn new(store: SessionStore, config: TrackerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(TrackerInner::new())),
            store,
            config,
            shutdown,
        }
    }

    /// A receiver that observes `true` once the session is terminated, used
    /// by the location sampler to release its subscription on stop.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Starts the session: records the wall-clock start fields and spawns
    /// the duration ticker. Fails when called more than once.
    pub async fn start(&self, workout_type: WorkoutType) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock().await;
        if inner.state != TrackerState::Idle {
            return Err(TrackerError::AlreadyStarted);
        }

        let now = Local::now();
        inner.state = TrackerState::Active;
        inner.workout_type = workout_type;
        inner.start_date = now.day();
        inner.start_month = now.month0();
        inner.start_year = now.year();
        inner.start_hour = now.hour();
        inner.start_minute = now.minute();
        let started = Instant::now();
        inner.previous_tick = started;
        inner.ticker = Some(self.spawn_ticker(started));

        info!("started {workout_type:?} session");
        Ok(())
    }

    fn spawn_ticker(&self, started: Instant) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let tick_interval = self.config.tick_interval;
        tokio::spawn(async move {
            // The first tick comes one full interval after start. An
            // immediate zero-length tick would charge the timer's rounding
            // to the session before any time has passed.
            let mut interval = time::interval_at(started + tick_interval, tick_interval);
            loop {
                interval.tick().await;
                let mut guard = inner.lock().await;
                // The session may have been stopped while waiting.
                if guard.state == TrackerState::Terminated {
                    break;
                }
                guard.apply_tick(Instant::now());
            }
        })
    }

    pub async fn pause(&self) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            TrackerState::Active => {
                inner.state = TrackerState::Paused;
                debug!("session paused");
                Ok(())
            }
            TrackerState::Terminated => Err(TrackerError::AlreadyTerminated),
            state => Err(TrackerError::InvalidState {
                operation: "pause",
                state: state.name(),
            }),
        }
    }

    pub async fn resume(&self) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            TrackerState::Paused => {
                inner.state = TrackerState::Active;
                debug!("session resumed");
                Ok(())
            }
            TrackerState::Terminated => Err(TrackerError::AlreadyTerminated),
            state => Err(TrackerError::InvalidState {
                operation: "resume",
                state: state.name(),
            }),
        }
    }

    /// Ends the session, persists the completed record and returns it with
    /// its assigned id. Termination is irreversible: it happens before the
    /// insert, so a persistence failure is surfaced to the caller but does
    /// not reopen the session.
    pub async fn stop(&self) -> Result<WorkoutSession, TrackerError> {
        let (record, ticker) = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                TrackerState::Active | TrackerState::Paused => {}
                TrackerState::Terminated => return Err(TrackerError::AlreadyTerminated),
                TrackerState::Idle => {
                    return Err(TrackerError::InvalidState {
                        operation: "stop",
                        state: inner.state.name(),
                    });
                }
            }
            inner.state = TrackerState::Terminated;
            (inner.completed_session(), inner.ticker.take())
        };

        // Release the location subscription before returning.
        let _ = self.shutdown.send(true);

        // Once the state is Terminated the ticker can no longer touch the
        // accumulators or notify anyone, so cancelling it is safe.
        if let Some(ticker) = ticker {
            ticker.abort();
            let _ = ticker.await;
        }

        let mut stored = record;
        stored.id = self.store.insert_session(&stored).await?;
        info!(session_id = stored.id, "session stored");
        Ok(stored)
    }

    /// Feeds one location fix into the session. Fixes arriving before start
    /// or after stop are ignored.
    pub async fn process_fix(&self, fix: LocationFix) {
        self.inner.lock().await.apply_fix(fix);
    }

    /// Registers a listener and immediately replays the current pace,
    /// distance and duration to it, so a freshly attached view is consistent
    /// without waiting for the next update.
    pub async fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        let mut inner = self.inner.lock().await;
        notify_one(&listener, SessionEvent::Pace(inner.current_pace_mps));
        notify_one(&listener, SessionEvent::Distance(inner.distance_m));
        notify_one(&listener, SessionEvent::Duration(inner.elapsed_duration_ms));
        inner.listeners.push(listener);
    }

    pub async fn remove_listener(&self, listener: &Arc<dyn SessionListener>) {
        let mut inner = self.inner.lock().await;
        inner.listeners.retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    pub async fn state(&self) -> TrackerState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    async fn tracker() -> SessionTracker {
        let store = SessionStore::open_in_memory().await.unwrap();
        SessionTracker::new(store, TrackerConfig::default())
    }

    #[derive(Default)]
    struct RecordingListener {
        durations: StdMutex<Vec<u64>>,
        distances: StdMutex<Vec<u64>>,
        paces: StdMutex<Vec<f64>>,
        locations: StdMutex<Vec<(f64, f64)>>,
    }

    impl SessionListener for RecordingListener {
        fn on_duration_updated(&self, duration_ms: u64) {
            self.durations.lock().unwrap().push(duration_ms);
        }
        fn on_distance_updated(&self, distance_m: u64) {
            self.distances.lock().unwrap().push(distance_m);
        }
        fn on_pace_updated(&self, metres_per_second: f64) {
            self.paces.lock().unwrap().push(metres_per_second);
        }
        fn on_location_updated(&self, latitude: f64, longitude: f64) {
            self.locations.lock().unwrap().push((latitude, longitude));
        }
    }

    struct PanickingListener;

    impl SessionListener for PanickingListener {
        fn on_duration_updated(&self, _duration_ms: u64) {
            panic!("listener failure");
        }
    }

    // Store access happens with the clock running; only the tick timing is
    // driven through the paused clock, so sqlx never races a frozen timer.
    #[tokio::test]
    async fn duration_accumulates_only_while_active() {
        let tracker = tracker().await;
        time::pause();
        tracker.start(WorkoutType::Running).await.unwrap();

        time::sleep(Duration::from_millis(610)).await;
        assert_eq!(tracker.snapshot().await.elapsed_duration_ms, 600);

        tracker.pause().await.unwrap();
        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(tracker.snapshot().await.elapsed_duration_ms, 600);
        assert_eq!(tracker.state().await, TrackerState::Paused);

        tracker.resume().await.unwrap();
        time::sleep(Duration::from_millis(410)).await;
        assert_eq!(tracker.snapshot().await.elapsed_duration_ms, 1_000);
    }

    #[tokio::test]
    async fn ticker_stops_with_the_session() {
        let tracker = tracker().await;
        time::pause();
        tracker.start(WorkoutType::Running).await.unwrap();
        time::sleep(Duration::from_millis(410)).await;
        time::resume();

        let stored = tracker.stop().await.unwrap();
        assert_eq!(stored.duration_ms, 400);

        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(tracker.snapshot().await.elapsed_duration_ms, 400);
        assert_eq!(tracker.state().await, TrackerState::Terminated);
    }

    #[tokio::test]
    async fn first_fix_seeds_then_deltas_accumulate() {
        let tracker = tracker().await;
        let listener = Arc::new(RecordingListener::default());
        tracker.start(WorkoutType::Running).await.unwrap();
        tracker.add_listener(listener.clone()).await;

        tracker.process_fix(LocationFix::new(0.0, 0.0, 0)).await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.distance_m, 0);
        assert_eq!(snapshot.current_pace_mps, 0.0);

        tracker.process_fix(LocationFix::new(0.0, 0.001, 1_000)).await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.distance_m, 111);
        assert_eq!(snapshot.current_pace_mps, 111.0);

        // The track records the previous baseline of each computation.
        assert_eq!(tracker.inner.lock().await.track, vec![Point::new(0.0, 0.0)]);

        assert_eq!(listener.distances.lock().unwrap().as_slice(), &[0, 111]);
        assert_eq!(
            listener.locations.lock().unwrap().as_slice(),
            &[(0.0, 0.001)]
        );
    }

    #[tokio::test]
    async fn paused_fixes_move_the_baseline_without_accumulating() {
        let tracker = tracker().await;
        let listener = Arc::new(RecordingListener::default());
        tracker.start(WorkoutType::Walking).await.unwrap();
        tracker.add_listener(listener.clone()).await;

        tracker.process_fix(LocationFix::new(0.0, 0.0, 0)).await;
        tracker.pause().await.unwrap();
        tracker.process_fix(LocationFix::new(0.0, 0.001, 1_000)).await;

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.distance_m, 0);
        assert_eq!(snapshot.current_pace_mps, 0.0);
        // No distance or pace notifications beyond the registration replay,
        // but the raw position still went out.
        assert_eq!(listener.distances.lock().unwrap().as_slice(), &[0]);
        assert_eq!(
            listener.locations.lock().unwrap().as_slice(),
            &[(0.0, 0.001)]
        );

        tracker.resume().await.unwrap();
        tracker.process_fix(LocationFix::new(0.0, 0.002, 2_000)).await;

        // Distance is measured from the fix seen while paused, not from the
        // pre-pause position.
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.distance_m, 111);
        assert_eq!(snapshot.current_pace_mps, 111.0);
    }

    #[tokio::test]
    async fn lifecycle_transitions_are_enforced() {
        let tracker = tracker().await;

        assert!(matches!(
            tracker.pause().await,
            Err(TrackerError::InvalidState { operation: "pause", state: "idle" })
        ));
        assert!(matches!(
            tracker.stop().await,
            Err(TrackerError::InvalidState { operation: "stop", state: "idle" })
        ));

        tracker.start(WorkoutType::Cycling).await.unwrap();
        assert!(matches!(
            tracker.start(WorkoutType::Cycling).await,
            Err(TrackerError::AlreadyStarted)
        ));
        assert!(matches!(
            tracker.resume().await,
            Err(TrackerError::InvalidState { operation: "resume", state: "active" })
        ));

        tracker.stop().await.unwrap();
        assert!(matches!(tracker.stop().await, Err(TrackerError::AlreadyTerminated)));
        assert!(matches!(tracker.pause().await, Err(TrackerError::AlreadyTerminated)));
        assert!(matches!(tracker.resume().await, Err(TrackerError::AlreadyTerminated)));
        assert!(matches!(
            tracker.start(WorkoutType::Cycling).await,
            Err(TrackerError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn stop_persists_the_completed_session() {
        let store = SessionStore::open_in_memory().await.unwrap();
        let tracker = SessionTracker::new(store.clone(), TrackerConfig::default());

        tracker.start(WorkoutType::Running).await.unwrap();
        tracker.process_fix(LocationFix::new(0.0, 0.0, 0)).await;
        tracker.process_fix(LocationFix::new(0.0, 0.001, 1_000)).await;

        let stored = tracker.stop().await.unwrap();
        assert!(stored.id >= 1);
        assert_eq!(stored.distance_m, 111);
        assert_eq!(stored.workout_type, WorkoutType::Running);
        assert_eq!(stored.latitudes, "0.0;");
        assert_eq!(stored.longitudes, "0.0;");

        let loaded = store.get_session(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);

        // Fixes after termination are ignored.
        tracker.process_fix(LocationFix::new(0.0, 0.002, 2_000)).await;
        assert_eq!(tracker.snapshot().await.distance_m, 111);
    }

    #[tokio::test]
    async fn registration_replays_current_values() {
        let tracker = tracker().await;
        tracker.start(WorkoutType::Running).await.unwrap();
        tracker.process_fix(LocationFix::new(0.0, 0.0, 0)).await;
        tracker.process_fix(LocationFix::new(0.0, 0.001, 1_000)).await;

        let listener = Arc::new(RecordingListener::default());
        tracker.add_listener(listener.clone()).await;

        assert_eq!(listener.paces.lock().unwrap().as_slice(), &[111.0]);
        assert_eq!(listener.distances.lock().unwrap().as_slice(), &[111]);
        assert_eq!(listener.durations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_starve_the_others() {
        let tracker = tracker().await;
        time::pause();
        tracker.start(WorkoutType::Running).await.unwrap();

        tracker.add_listener(Arc::new(PanickingListener)).await;
        let healthy = Arc::new(RecordingListener::default());
        tracker.add_listener(healthy.clone()).await;

        time::sleep(Duration::from_millis(210)).await;
        // The registration replay, then exactly one whole tick.
        assert_eq!(healthy.durations.lock().unwrap().as_slice(), &[0, 200]);
    }

    #[tokio::test]
    async fn stop_surfaces_persistence_failures_and_stays_terminated() {
        let store = SessionStore::open_in_memory().await.unwrap();
        let tracker = SessionTracker::new(store.clone(), TrackerConfig::default());
        tracker.start(WorkoutType::Running).await.unwrap();

        store.close().await;

        assert!(matches!(tracker.stop().await, Err(TrackerError::Persistence(_))));
        assert_eq!(tracker.state().await, TrackerState::Terminated);
        assert!(matches!(tracker.stop().await, Err(TrackerError::AlreadyTerminated)));
    }

    #[tokio::test]
    async fn removed_listener_receives_nothing_further() {
        let tracker = tracker().await;
        tracker.start(WorkoutType::Running).await.unwrap();

        let listener: Arc<RecordingListener> = Arc::new(RecordingListener::default());
        let as_dyn: Arc<dyn SessionListener> = listener.clone();
        tracker.add_listener(as_dyn.clone()).await;
        tracker.remove_listener(&as_dyn).await;

        tracker.process_fix(LocationFix::new(0.0, 0.0, 0)).await;
        tracker.process_fix(LocationFix::new(0.0, 0.001, 1_000)).await;

        // Only the registration replay was observed.
        assert_eq!(listener.distances.lock().unwrap().as_slice(), &[0]);
        assert!(listener.locations.lock().unwrap().is_empty());
    }
}
