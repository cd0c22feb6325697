use super::{ArrivalSender, LaneFileSource};
use crate::error::IngestError;
use crate::event_log::EventLog;
use log::Level;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the lane files are checked for new arrivals.
pub const FILE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// A background thread which tails a [LaneFileSource] and offers every
/// arrival to the scheduler. The thread stops when the poller is dropped, or
/// when the scheduler's end of the arrival channel is gone.
#[derive(Debug)]
pub struct FilePoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FilePoller {
    /// Starts polling `source` every `interval`.
    pub fn spawn(
        mut source: LaneFileSource,
        sender: ArrivalSender,
        interval: Duration,
        log: Arc<dyn EventLog>,
    ) -> Result<Self, IngestError> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = stop.clone();
            thread::Builder::new()
                .name("lane-file-poller".into())
                .spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        if sender.is_disconnected() {
                            log.log(Level::Info, "arrival consumer is gone; stopping file poller");
                            break;
                        }
                        for event in source.poll(&*log) {
                            sender.offer(event);
                        }
                        thread::sleep(interval);
                    }
                })
                .map_err(IngestError::Spawn)?
        };
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the polling thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Stops the polling thread and waits for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FilePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::RecentLog;
    use crate::ingest::{arrival_channel, OverflowPolicy};
    use std::fs;
    use std::io::Write;
    use std::time::Instant;

    #[test]
    fn forwards_appended_lines() {
        let dir = std::env::temp_dir().join(format!("junction-sim-poller-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let log = Arc::new(RecentLog::silent(10));
        let source = LaneFileSource::open(&dir).unwrap();
        let (tx, rx) = arrival_channel(16, OverflowPolicy::DropOldest, log.clone());
        let poller = FilePoller::spawn(source, tx, Duration::from_millis(5), log).unwrap();
        assert!(poller.is_running());

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(dir.join("lane_c2.txt"))
            .unwrap();
        file.write_all(b"9,R;\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = None;
        while received.is_none() && Instant::now() < deadline {
            received = rx.recv_timeout(Duration::from_millis(50)).ok();
        }
        poller.stop();

        let event = received.unwrap();
        assert_eq!(event.vehicle_id, 9);
        assert_eq!(event.lane.to_string(), "CL2");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stops_once_the_receiver_is_dropped() {
        let dir = std::env::temp_dir().join(format!("junction-sim-orphan-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let log = Arc::new(RecentLog::silent(10));
        let source = LaneFileSource::open(&dir).unwrap();
        let (tx, rx) = arrival_channel(16, OverflowPolicy::DropOldest, log.clone());
        let poller = FilePoller::spawn(source, tx, Duration::from_millis(5), log.clone()).unwrap();
        drop(rx);

        let deadline = Instant::now() + Duration::from_secs(5);
        while poller.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!poller.is_running());
        assert_eq!(log.count(Level::Info), 1);
        drop(poller);
        fs::remove_dir_all(&dir).unwrap();
    }
}
