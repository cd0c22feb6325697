//! Logging collaborators that are injected into the scheduler and ingestion.

use log::Level;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// The log target used for junction messages.
pub const LOG_TARGET: &str = "junction";

/// A sink for diagnostic messages.
pub trait EventLog: Send + Sync {
    /// Records a message at the given level.
    fn log(&self, level: Level, message: &str);
}

/// Forwards messages to the [log] facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFacade;

impl EventLog for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: LOG_TARGET, level, "{}", message);
    }
}

/// A recorded log message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Keeps the most recent messages in memory, e.g. for an on-screen overlay,
/// and optionally forwards every message to the [log] facade.
#[derive(Debug)]
pub struct RecentLog {
    /// The maximum number of retained messages.
    capacity: usize,
    /// Whether messages are also sent to the [log] facade.
    forward: bool,
    /// The retained messages, oldest first.
    entries: Mutex<VecDeque<LogEntry>>,
}

impl RecentLog {
    /// The default number of retained messages.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Creates a log which retains up to `capacity` messages and forwards them
    /// to the [log] facade.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            forward: true,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Creates a log which only retains messages in memory.
    pub fn silent(capacity: usize) -> Self {
        Self {
            forward: false,
            ..Self::new(capacity)
        }
    }

    /// Gets up to `count` of the most recent messages, oldest first.
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Counts the retained messages at the given level.
    pub fn count(&self, level: Level) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|entry| entry.level == level).count()
    }

    /// Discards all retained messages.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventLog for RecentLog {
    fn log(&self, level: Level, message: &str) {
        if self.forward {
            LogFacade.log(level, message);
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            level,
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_most_recent() {
        let log = RecentLog::silent(3);
        for i in 0..5 {
            log.log(Level::Info, &format!("message {i}"));
        }
        let recent = log.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "message 2");
        assert_eq!(log.recent(1)[0].message, "message 4");
    }

    #[test]
    fn counts_by_level() {
        let log = RecentLog::silent(10);
        log.log(Level::Warn, "a");
        log.log(Level::Info, "b");
        log.log(Level::Warn, "c");
        assert_eq!(log.count(Level::Warn), 2);
        log.clear();
        assert_eq!(log.count(Level::Warn), 0);
    }
}
