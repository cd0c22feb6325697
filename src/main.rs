use std::sync::Arc;
use std::time::{Duration, Instant};

use junction_sim::ingest::{FilePoller, LaneFileSource, TrafficGenerator, FILE_CHECK_INTERVAL};
use junction_sim::{EventLog, IntersectionScheduler, JunctionConfig, LogFacade};

/// The simulation time step.
const TRAFFIC_UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// How often a statistics line is logged.
const STATS_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = JunctionConfig::default();
    let log: Arc<dyn EventLog> = Arc::new(LogFacade);
    let (mut scheduler, sender) = IntersectionScheduler::with_channel(config, log.clone())?;

    // With a data directory, arrivals come from lane files; otherwise they are generated.
    let (_poller, mut generator) = match std::env::args().nth(1) {
        Some(dir) => {
            let source = LaneFileSource::open(&dir)?;
            log::info!("reading lane files from {}", source.dir().display());
            let poller = FilePoller::spawn(source, sender.clone(), FILE_CHECK_INTERVAL, log)?;
            (Some(poller), None)
        }
        None => {
            log::info!("generating random traffic");
            let priority_lane = scheduler.config().priority_lane;
            (None, Some(TrafficGenerator::from_entropy(priority_lane)))
        }
    };

    let dt = TRAFFIC_UPDATE_INTERVAL.as_secs_f64();
    let mut last_stats = Instant::now();
    loop {
        let start = Instant::now();
        if let Some(generator) = &mut generator {
            let queued = scheduler.stats().per_lane_queue_size;
            for event in generator.advance(dt, &queued) {
                sender.offer(event);
            }
        }

        let report = scheduler.tick(dt);
        if let Some(phase) = report.phase_change {
            log::debug!("{} vehicles left; light is {}", report.departures.len(), phase);
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            log::info!(
                "{} | light {} (next {})",
                scheduler.stats(),
                scheduler.current_phase(),
                scheduler.state().light().next_phase()
            );
            last_stats = Instant::now();
        }

        if let Some(remaining) = TRAFFIC_UPDATE_INTERVAL.checked_sub(start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}
