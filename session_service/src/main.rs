use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_service::{LocationSampler, SamplerConfig, SessionTracker, TrackerConfig};
use workout_tracker_data_management::{
    SessionStore,
    statistics::{Metric, Statistics},
};
use workout_tracker_lib::{formatter, location_fix::LocationFix, workout_type::WorkoutType};

/// Records one synthetic run into the local store and prints the resulting
/// monthly statistics.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = SessionStore::open("data/sessions.db").await?;
    let tracker = Arc::new(SessionTracker::new(store.clone(), TrackerConfig::default()));

    let (fix_tx, fix_rx) = mpsc::channel(32);
    let sampler = LocationSampler::new(SamplerConfig::default());
    let forwarding = tokio::spawn(sampler.run(fix_rx, Arc::clone(&tracker)));

    tracker.start(WorkoutType::Running).await?;

    // A short jog east along the equator, one fix per second.
    for step in 0..10u64 {
        let fix = LocationFix::new(0.0, 0.0001 * step as f64, step * 1_000);
        fix_tx.send(fix).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    drop(fix_tx);
    forwarding.await?;

    let session = tracker.stop().await?;
    println!("distance: {}", formatter::format_distance(session.distance_m));
    println!("duration: {}", formatter::format_duration(session.duration_ms));
    println!("avg pace: {}", formatter::format_average_speed(session.average_pace_mps()));

    let statistics = Statistics::new(store);
    let totals = statistics
        .monthly_totals(session.year, Metric::Distance, &[])
        .await?;
    for (month, total) in totals {
        println!("{}: {}", formatter::format_month(month), formatter::format_distance(total));
    }

    Ok(())
}
