//! Error types.

use crate::lane::LaneId;
use thiserror::Error;

/// A vehicle record that could not be parsed from an ingestion line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing '{separator}' in record {line:?}")]
    MissingSeparator { separator: char, line: String },
    #[error("record {0:?} is not terminated by ';'")]
    Unterminated(String),
    #[error("invalid vehicle id {0:?}")]
    InvalidVehicleId(String),
    #[error("invalid direction {0:?}")]
    InvalidDirection(String),
    #[error("invalid road {0:?}")]
    InvalidRoad(String),
    #[error("invalid lane number {0:?}")]
    InvalidLaneNumber(String),
    #[error("lane {0} only carries incoming traffic")]
    IncomingLane(LaneId),
}

/// A vehicle that a lane queue refused to admit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaneError {
    #[error("vehicle {vehicle} belongs to lane {expected}, not {actual}")]
    LaneMismatch {
        vehicle: u32,
        expected: LaneId,
        actual: LaneId,
    },
    #[error("vehicle {vehicle} cannot spawn on incoming lane {lane}")]
    IncomingLane { vehicle: u32, lane: LaneId },
}

/// A broken internal invariant. This indicates a logic bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// An invalid [JunctionConfig](crate::JunctionConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("lane {0} cannot be the priority lane; only slot 2 lanes are gated")]
    InvalidPriorityLane(LaneId),
    #[error("exit threshold {exit_below} must be strictly below the entry threshold {enter_above}")]
    InvertedThresholds { enter_above: usize, exit_below: usize },
    #[error("minimum state time {min}s exceeds maximum state time {max}s")]
    InvertedStateTimes { min: f64, max: f64 },
    #[error("minimum phase duration {min}s exceeds maximum phase duration {max}s")]
    InvertedPhaseBounds { min: f64, max: f64 },
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),
    #[cfg(feature = "serde")]
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure of the lane-file ingestion source.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("lane file {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start the lane file poller: {0}")]
    Spawn(#[source] std::io::Error),
}
