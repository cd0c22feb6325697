//! Priority-mode decisions and the green-time budget.

use crate::config::JunctionConfig;
use crate::junction::JunctionState;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether the junction is serving the priority lane exclusively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PriorityMode {
    /// All four approaches are served in turn.
    #[default]
    Normal,
    /// The priority lane is served exclusively.
    Priority,
}

impl PriorityMode {
    /// The other mode.
    pub fn flipped(self) -> Self {
        match self {
            PriorityMode::Normal => PriorityMode::Priority,
            PriorityMode::Priority => PriorityMode::Normal,
        }
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PriorityMode::Normal => "NORMAL",
            PriorityMode::Priority => "PRIORITY",
        })
    }
}

/// Why the priority mode changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransitionCause {
    /// The priority lane crossed a queue threshold.
    Threshold,
    /// The mode was held for the maximum state time.
    Timeout,
}

/// A change of priority mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModeChange {
    /// The mode being entered.
    pub to: PriorityMode,
    pub cause: TransitionCause,
}

/// The current priority mode and how long it has been held.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModeTracker {
    mode: PriorityMode,
    /// The time since the mode last changed, in s.
    state_timer: f64,
}

impl ModeTracker {
    pub fn mode(&self) -> PriorityMode {
        self.mode
    }

    /// The time since the mode last changed, in s.
    pub fn state_timer(&self) -> f64 {
        self.state_timer
    }

    pub(crate) fn advance(&mut self, dt: f64) {
        self.state_timer += dt;
    }

    /// Enters the given mode and restarts the state timer.
    pub(crate) fn enter(&mut self, mode: PriorityMode) {
        self.mode = mode;
        self.state_timer = 0.0;
    }
}

/// How many vehicles a normal lane may release and for how long its road stays green.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThroughputBudget {
    /// The mean queue length over the normal lanes.
    pub avg_waiting: f64,
    /// The number of vehicles released from each normal lane per processing interval.
    pub vehicles_per_lane: usize,
    /// The green phase duration and processing interval, in s.
    pub phase_duration: f64,
}

impl ThroughputBudget {
    /// The phase duration in whole milliseconds.
    pub fn phase_duration_ms(&self) -> u64 {
        (self.phase_duration * 1000.0).round() as u64
    }
}

/// Decides when to enter or leave priority mode, and how much green time to allot.
///
/// The evaluator holds no state of its own; every decision is made afresh
/// from a snapshot of the junction.
#[derive(Clone, Copy, Debug)]
pub struct PriorityEvaluator<'a> {
    config: &'a JunctionConfig,
}

impl<'a> PriorityEvaluator<'a> {
    pub fn new(config: &'a JunctionConfig) -> Self {
        Self { config }
    }

    /// Decides whether the junction should change priority mode.
    pub fn evaluate(&self, junction: &JunctionState) -> Option<ModeChange> {
        let tracker = junction.mode_tracker();
        self.decide(
            tracker.mode(),
            tracker.state_timer(),
            junction.priority_lane().len(),
        )
    }

    /// Decides whether to change mode given the current mode, the time it has
    /// been held and the priority lane's queue length.
    ///
    /// Thresholds only apply once the mode has been held for the minimum state
    /// time. A mode held for the maximum state time is flipped unconditionally.
    pub fn decide(
        &self,
        mode: PriorityMode,
        state_timer: f64,
        priority_len: usize,
    ) -> Option<ModeChange> {
        let thresholds = &self.config.thresholds;
        let dwelled = state_timer >= self.config.min_state_time;
        let crossed = match mode {
            PriorityMode::Normal => priority_len > thresholds.enter_above,
            PriorityMode::Priority => priority_len < thresholds.exit_below,
        };
        if dwelled && crossed {
            Some(ModeChange {
                to: mode.flipped(),
                cause: TransitionCause::Threshold,
            })
        } else if state_timer >= self.config.max_state_time {
            Some(ModeChange {
                to: mode.flipped(),
                cause: TransitionCause::Timeout,
            })
        } else {
            None
        }
    }

    /// Computes the budget for the junction's normal lanes.
    pub fn budget(&self, junction: &JunctionState) -> ThroughputBudget {
        let (total, count) = junction
            .normal_lanes()
            .fold((0usize, 0usize), |(total, count), lane| (total + lane.len(), count + 1));
        let avg_waiting = if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        };
        self.budget_for(avg_waiting)
    }

    /// Computes the budget for a given mean queue length.
    ///
    /// Each waiting vehicle earns `seconds_per_vehicle` of green time, within
    /// the configured phase bounds. At least one vehicle is always released.
    pub fn budget_for(&self, avg_waiting: f64) -> ThroughputBudget {
        let avg_waiting = avg_waiting.max(0.0);
        let release = (avg_waiting * self.config.process_fraction).ceil() as usize;
        ThroughputBudget {
            avg_waiting,
            vehicles_per_lane: release.max(1),
            phase_duration: self
                .config
                .phase_bounds
                .clamp(avg_waiting * self.config.seconds_per_vehicle),
        }
    }

    /// The number of vehicles to release from the priority lane in priority mode.
    pub fn priority_release(&self, priority_len: usize) -> usize {
        priority_len.saturating_sub(self.config.thresholds.release_to)
    }
}
