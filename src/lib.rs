pub use config::{JunctionConfig, PriorityThresholds};
pub use error::{ConfigError, IngestError, InvariantViolation, LaneError, ParseError};
pub use event_log::{EventLog, LogEntry, LogFacade, RecentLog, LOG_TARGET};
pub use junction::{JunctionState, JunctionStats, LaneStatus};
pub use lane::{Admission, LaneId, LaneKind, LaneQueue, Road, LANE_COUNT, PRIORITY_SCORE};
pub use light::{LightPhase, LightPhaseStateMachine, PhaseTiming};
pub use priority::{
    ModeChange, ModeTracker, PriorityEvaluator, PriorityMode, ThroughputBudget, TransitionCause,
};
pub use scheduler::{IntersectionScheduler, TickReport};
pub use util::Interval;
pub use vehicle::{Direction, VehicleRecord};

mod config;
mod debug;
mod error;
mod event_log;
pub mod ingest;
mod junction;
mod lane;
mod light;
mod priority;
mod scheduler;
mod util;
mod vehicle;
