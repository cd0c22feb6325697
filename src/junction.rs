use crate::config::{JunctionConfig, PriorityThresholds};
use crate::error::InvariantViolation;
use crate::lane::{LaneId, LaneKind, LaneQueue, Road, LANE_COUNT};
use crate::light::LightPhaseStateMachine;
use crate::priority::{ModeTracker, PriorityMode};
use arrayvec::ArrayVec;
use itertools::Itertools;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The state of the junction: its lane queues, priority mode, traffic light and statistics.
#[derive(Clone, Debug)]
pub struct JunctionState {
    /// The lane queues, indexed by [LaneId::index].
    lanes: [LaneQueue; LANE_COUNT],
    /// The designated priority lane.
    priority_lane: LaneId,
    /// The thresholds used to derive lane priority scores.
    thresholds: PriorityThresholds,
    /// The priority mode and its dwell timer.
    mode: ModeTracker,
    /// The traffic light.
    light: LightPhaseStateMachine,
    /// The simulation time in s.
    clock: f64,
    /// The number of vehicles that have left the junction.
    total_processed: u64,
    /// The number of vehicles that have left the junction since the mode last changed.
    processed_in_state: u64,
    /// The mean wait time of the queued vehicles, in s.
    average_wait_time: f64,
}

/// A snapshot of a single lane, for observers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneStatus {
    pub lane: LaneId,
    pub queue_size: usize,
    /// The lane's priority score.
    pub priority: u32,
    /// Whether the lane is currently being served.
    pub is_active: bool,
    /// The wait time of the vehicle at the head of the queue, in s.
    pub wait_time: f64,
}

/// Running statistics for the junction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JunctionStats {
    /// The mean wait time of the queued vehicles, in s.
    pub avg_wait_time: f64,
    pub total_processed: u64,
    /// Queue lengths, indexed by [LaneId::index].
    pub per_lane_queue_size: [usize; LANE_COUNT],
    pub is_priority_mode: bool,
}

impl JunctionState {
    /// Creates an empty junction.
    pub fn new(config: &JunctionConfig) -> Self {
        Self {
            lanes: LaneId::ALL.map(|id| {
                LaneQueue::new(id, id == config.priority_lane, config.lane_capacity)
            }),
            priority_lane: config.priority_lane,
            thresholds: config.thresholds,
            mode: ModeTracker::default(),
            light: LightPhaseStateMachine::new(),
            clock: 0.0,
            total_processed: 0,
            processed_in_state: 0,
            average_wait_time: 0.0,
        }
    }

    /// Gets a reference to the queue of the given lane.
    pub fn lane(&self, id: LaneId) -> &LaneQueue {
        &self.lanes[id.index()]
    }

    pub(crate) fn lane_mut(&mut self, id: LaneId) -> &mut LaneQueue {
        &mut self.lanes[id.index()]
    }

    /// Returns an iterator over all the lanes.
    pub fn lanes(&self) -> impl Iterator<Item = &LaneQueue> {
        self.lanes.iter()
    }

    /// The designated priority lane.
    pub fn priority_lane(&self) -> &LaneQueue {
        self.lane(self.priority_lane)
    }

    /// Returns an iterator over the normal lanes: every lane except the
    /// priority lane and the free lanes.
    pub fn normal_lanes(&self) -> impl Iterator<Item = &LaneQueue> {
        self.lanes.iter().filter(|lane| lane.is_normal_lane())
    }

    /// The IDs of the normal lanes.
    pub fn normal_lane_ids(&self) -> ArrayVec<LaneId, LANE_COUNT> {
        self.normal_lanes().map(|lane| lane.id()).collect()
    }

    /// The IDs of the lanes on `road` that wait for its green: every lane
    /// except its free lane.
    pub fn gated_lane_ids(&self, road: Road) -> ArrayVec<LaneId, LANE_COUNT> {
        self.lanes
            .iter()
            .filter(|lane| lane.id().road() == road && !lane.is_free_lane())
            .map(|lane| lane.id())
            .collect()
    }

    /// The IDs of the free lanes.
    pub fn free_lane_ids(&self) -> ArrayVec<LaneId, LANE_COUNT> {
        self.lanes
            .iter()
            .filter(|lane| lane.is_free_lane())
            .map(|lane| lane.id())
            .collect()
    }

    pub fn mode_tracker(&self) -> &ModeTracker {
        &self.mode
    }

    pub(crate) fn mode_tracker_mut(&mut self) -> &mut ModeTracker {
        &mut self.mode
    }

    pub fn mode(&self) -> PriorityMode {
        self.mode.mode()
    }

    /// Whether the priority lane is being served exclusively.
    pub fn priority_mode(&self) -> bool {
        self.mode.mode() == PriorityMode::Priority
    }

    /// The time since the priority mode last changed, in s.
    pub fn state_timer(&self) -> f64 {
        self.mode.state_timer()
    }

    pub fn light(&self) -> &LightPhaseStateMachine {
        &self.light
    }

    pub(crate) fn light_mut(&mut self) -> &mut LightPhaseStateMachine {
        &mut self.light
    }

    /// The time since the last light transition, in s.
    pub fn phase_timer(&self) -> f64 {
        self.light.phase_timer()
    }

    /// The simulation time in s.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    /// The number of vehicles that have left since the priority mode last changed.
    pub fn processed_in_state(&self) -> u64 {
        self.processed_in_state
    }

    /// The mean wait time of the queued vehicles, in s.
    pub fn average_wait_time(&self) -> f64 {
        self.average_wait_time
    }

    /// The total number of queued vehicles.
    pub fn queued_vehicles(&self) -> usize {
        self.lanes.iter().map(|lane| lane.len()).sum()
    }

    /// Advances the clock and the wait time of every queued vehicle.
    pub(crate) fn advance(&mut self, dt: f64) {
        self.clock += dt;
        self.mode.advance(dt);
        for lane in &mut self.lanes {
            lane.accrue_wait(dt);
        }
    }

    pub(crate) fn record_departures(&mut self, count: usize) {
        self.total_processed += count as u64;
        self.processed_in_state += count as u64;
    }

    pub(crate) fn reset_processed_in_state(&mut self) {
        self.processed_in_state = 0;
    }

    /// Recomputes the mean wait time over the queued vehicles.
    pub(crate) fn recompute_average_wait(&mut self) {
        let (total, count) = self
            .lanes
            .iter()
            .flat_map(|lane| lane.iter())
            .fold((0.0, 0usize), |(total, count), v| (total + v.wait_time(), count + 1));
        self.average_wait_time = if count == 0 {
            0.0
        } else {
            total / count as f64
        };
    }

    /// Whether the given lane is currently being served.
    fn is_active(&self, lane: &LaneQueue) -> bool {
        if lane.is_free_lane() {
            return true;
        }
        match self.light.active_green_road() {
            Some(road) if road == lane.id().road() => {
                !self.priority_mode() || lane.is_priority_lane()
            }
            _ => false,
        }
    }

    /// Gets a snapshot of every lane.
    pub fn lane_statuses(&self) -> [LaneStatus; LANE_COUNT] {
        let priority_mode = self.priority_mode();
        LaneId::ALL.map(|id| {
            let lane = self.lane(id);
            LaneStatus {
                lane: id,
                queue_size: lane.len(),
                priority: lane.priority_score(priority_mode, &self.thresholds),
                is_active: self.is_active(lane),
                wait_time: lane.head_wait_time(),
            }
        })
    }

    /// Gets the junction's running statistics.
    pub fn stats(&self) -> JunctionStats {
        JunctionStats {
            avg_wait_time: self.average_wait_time,
            total_processed: self.total_processed,
            per_lane_queue_size: LaneId::ALL.map(|id| self.lane(id).len()),
            is_priority_mode: self.priority_mode(),
        }
    }

    /// Checks the structural invariants of the junction.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let priority = self.lanes.iter().filter(|l| l.is_priority_lane()).count();
        if priority != 1 {
            return Err(InvariantViolation(format!(
                "expected one priority lane, found {priority}"
            )));
        }
        let free = self.lanes.iter().filter(|l| l.is_free_lane()).count();
        if free != 4 {
            return Err(InvariantViolation(format!(
                "expected four free lanes, found {free}"
            )));
        }
        if let Some(lane) = self
            .lanes
            .iter()
            .find(|l| l.is_priority_lane() && l.id().kind() != LaneKind::Gated)
        {
            return Err(InvariantViolation(format!(
                "priority lane {} is not gated",
                lane.id()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for JunctionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} processed={} avg_wait={:.1}s queues=[{}]",
            if self.is_priority_mode { "PRIORITY" } else { "NORMAL" },
            self.total_processed,
            self.avg_wait_time,
            LaneId::ALL
                .iter()
                .zip(self.per_lane_queue_size)
                .map(|(id, size)| format!("{id}:{size}"))
                .join(" ")
        )
    }
}
