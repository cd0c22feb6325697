//! Tunable junction parameters.

use crate::error::ConfigError;
use crate::ingest::OverflowPolicy;
use crate::lane::{LaneId, LaneKind};
use crate::util::Interval;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Queue lengths that drive the priority lane's hysteresis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PriorityThresholds {
    /// Priority mode is entered once the priority lane holds more than this many vehicles.
    pub enter_above: usize,
    /// Priority mode is left once the priority lane holds fewer than this many vehicles.
    pub exit_below: usize,
    /// While in priority mode, the priority lane is drained down to this many vehicles.
    pub release_to: usize,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            enter_above: 10,
            exit_below: 5,
            release_to: 5,
        }
    }
}

/// The parameters of a junction. All durations are in seconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JunctionConfig {
    /// The lane that may trigger priority mode.
    pub priority_lane: LaneId,
    /// The priority lane's queue thresholds.
    pub thresholds: PriorityThresholds,
    /// The minimum time spent in a priority mode before it may change.
    pub min_state_time: f64,
    /// The time after which the priority mode is flipped regardless of queue lengths.
    pub max_state_time: f64,
    /// Green time allotted per average waiting vehicle.
    pub seconds_per_vehicle: f64,
    /// The bounds on a normal green phase.
    pub phase_bounds: Interval<f64>,
    /// The length of the all-red clearance phase.
    pub all_red_duration: f64,
    /// The length of the priority road's green phase in priority mode.
    pub priority_green_duration: f64,
    /// The fraction of the average queue length released per normal lane.
    pub process_fraction: f64,
    /// The soft cap on the number of vehicles queued in one lane.
    pub lane_capacity: usize,
    /// The capacity of the arrival hand-off channel.
    pub ingest_capacity: usize,
    /// What to do when the arrival channel is full.
    pub overflow: OverflowPolicy,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            priority_lane: LaneId::AL2,
            thresholds: PriorityThresholds::default(),
            min_state_time: 5.0,
            max_state_time: 30.0,
            seconds_per_vehicle: 2.0,
            phase_bounds: Interval::new(3.0, 15.0),
            all_red_duration: 2.0,
            priority_green_duration: 6.0,
            process_fraction: 1.0,
            lane_capacity: 64,
            ingest_capacity: 256,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

impl JunctionConfig {
    /// Uses the given lane as the priority lane.
    pub fn with_priority_lane(mut self, lane: LaneId) -> Self {
        self.priority_lane = lane;
        self
    }

    /// Checks that the parameters describe a junction that can make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority_lane.kind() != LaneKind::Gated {
            return Err(ConfigError::InvalidPriorityLane(self.priority_lane));
        }
        let thresholds = &self.thresholds;
        if thresholds.exit_below >= thresholds.enter_above {
            return Err(ConfigError::InvertedThresholds {
                enter_above: thresholds.enter_above,
                exit_below: thresholds.exit_below,
            });
        }
        for (name, value) in [
            ("min_state_time", self.min_state_time),
            ("max_state_time", self.max_state_time),
            ("seconds_per_vehicle", self.seconds_per_vehicle),
            ("phase_bounds.min", self.phase_bounds.min),
            ("phase_bounds.max", self.phase_bounds.max),
            ("all_red_duration", self.all_red_duration),
            ("priority_green_duration", self.priority_green_duration),
            ("process_fraction", self.process_fraction),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.min_state_time > self.max_state_time {
            return Err(ConfigError::InvertedStateTimes {
                min: self.min_state_time,
                max: self.max_state_time,
            });
        }
        if !self.phase_bounds.is_ordered() {
            return Err(ConfigError::InvertedPhaseBounds {
                min: self.phase_bounds.min,
                max: self.phase_bounds.max,
            });
        }
        if self.lane_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("lane_capacity"));
        }
        if self.ingest_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("ingest_capacity"));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: JunctionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::Road;

    #[test]
    fn defaults_are_valid() {
        assert!(JunctionConfig::default().validate().is_ok());
    }

    #[test]
    fn priority_lane_must_be_gated() {
        let config = JunctionConfig::default()
            .with_priority_lane(LaneId::new(Road::B, LaneKind::Free));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPriorityLane(_))
        ));

        let config = JunctionConfig::default()
            .with_priority_lane(LaneId::new(Road::C, LaneKind::Gated));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = JunctionConfig::default();
        config.thresholds.exit_below = 12;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedThresholds { .. })
        ));
    }

    #[test]
    fn rejects_equal_thresholds() {
        let mut config = JunctionConfig::default();
        config.thresholds.enter_above = 10;
        config.thresholds.exit_below = 10;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvertedThresholds {
                enter_above: 10,
                exit_below: 10
            }
        ));
        assert!(err.to_string().contains("strictly below"));

        config.thresholds.exit_below = 9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_durations() {
        let mut config = JunctionConfig::default();
        config.all_red_duration = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "all_red_duration", .. })
        ));

        let mut config = JunctionConfig::default();
        config.phase_bounds = Interval::new(20.0, 15.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedPhaseBounds { .. })
        ));

        let mut config = JunctionConfig::default();
        config.min_state_time = 40.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedStateTimes { .. })
        ));
    }

    #[test]
    fn rejects_zero_capacities() {
        let mut config = JunctionConfig::default();
        config.ingest_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroCapacity("ingest_capacity"))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parses_partial_json() {
        let config = JunctionConfig::from_json(r#"{ "max_state_time": 45.0 }"#).unwrap();
        assert_eq!(config.max_state_time, 45.0);
        assert_eq!(config.priority_lane, LaneId::AL2);
        assert!(JunctionConfig::from_json("{ not json").is_err());
    }
}
