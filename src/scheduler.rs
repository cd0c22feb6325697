use crate::config::JunctionConfig;
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::debug::{debug_departures, debug_mode_change, debug_phase};
use crate::error::{ConfigError, LaneError};
use crate::event_log::EventLog;
use crate::ingest::{arrival_channel, ArrivalEvent, ArrivalReceiver, ArrivalSender};
use crate::junction::{JunctionState, JunctionStats, LaneStatus};
use crate::lane::{Admission, LaneKind, Road, LANE_COUNT};
use crate::light::{LightPhase, PhaseTiming};
use crate::priority::{ModeChange, PriorityEvaluator, PriorityMode, ThroughputBudget};
use crate::vehicle::VehicleRecord;
use log::Level;
use smallvec::SmallVec;
use std::sync::Arc;

/// Drives the junction: admits arrivals, decides the priority mode, releases
/// vehicles and advances the traffic light.
pub struct IntersectionScheduler {
    /// The junction parameters.
    config: JunctionConfig,
    /// The lane queues, mode and light.
    state: JunctionState,
    /// Pending arrivals, drained at the start of every tick.
    arrivals: ArrivalReceiver,
    /// Where diagnostic messages go.
    log: Arc<dyn EventLog>,
    /// The road whose green phase has already released its normal-mode budget.
    served_green: Option<Road>,
    /// Debugging information from the previous tick.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

/// What happened during a single tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// The vehicles that left the junction, in the order they left.
    pub departures: SmallVec<[VehicleRecord; 8]>,
    /// The priority mode change, if one took place.
    pub mode_change: Option<ModeChange>,
    /// The light's new phase, if it changed.
    pub phase_change: Option<LightPhase>,
}

impl IntersectionScheduler {
    /// Creates a scheduler which consumes arrivals from `arrivals`.
    pub fn new(
        config: JunctionConfig,
        arrivals: ArrivalReceiver,
        log: Arc<dyn EventLog>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: JunctionState::new(&config),
            config,
            arrivals,
            log,
            served_green: None,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        })
    }

    /// Creates a scheduler together with the sender for its arrival channel.
    pub fn with_channel(
        config: JunctionConfig,
        log: Arc<dyn EventLog>,
    ) -> Result<(Self, ArrivalSender), ConfigError> {
        config.validate()?;
        let (sender, arrivals) =
            arrival_channel(config.ingest_capacity, config.overflow, log.clone());
        Ok((Self::new(config, arrivals, log)?, sender))
    }

    /// Advances the junction by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let phase = self.state.light().phase();
        let mut report = TickReport::default();

        self.drain_arrivals();
        self.advance_timers(dt);
        report.mode_change = self.update_mode();
        self.release_gated_lanes(&mut report.departures);
        self.release_free_lanes(&mut report.departures);
        self.state.record_departures(report.departures.len());
        self.state.recompute_average_wait();
        self.update_light(dt);

        let next = self.state.light().phase();
        if next != phase {
            debug_phase(next);
            report.phase_change = Some(next);
        }

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame(&self.state);
        }
        report
    }

    /// Queues an arriving vehicle immediately.
    ///
    /// Vehicles cannot arrive in incoming lanes. A lane over its soft capacity
    /// evicts its newest vehicle; this is logged but still counts as admitted.
    pub fn admit(&mut self, event: ArrivalEvent) -> Result<(), LaneError> {
        if event.lane.kind() == LaneKind::Incoming {
            let err = LaneError::IncomingLane {
                vehicle: event.vehicle_id,
                lane: event.lane,
            };
            self.log.log(Level::Warn, &format!("dropping arrival: {err}"));
            return Err(err);
        }
        let record = event.into_record(self.state.clock());
        match self.state.lane_mut(event.lane).enqueue(record) {
            Ok(Admission::Queued) => Ok(()),
            Ok(Admission::Evicted(vehicle)) => {
                self.log.log(
                    Level::Warn,
                    &format!(
                        "lane {} is over capacity; evicted vehicle {}",
                        event.lane,
                        vehicle.id()
                    ),
                );
                Ok(())
            }
            Err(err) => {
                self.log.log(Level::Warn, &format!("dropping arrival: {err}"));
                Err(err)
            }
        }
    }

    /// Gets the junction parameters.
    pub fn config(&self) -> &JunctionConfig {
        &self.config
    }

    /// Gets the junction state.
    pub fn state(&self) -> &JunctionState {
        &self.state
    }

    pub fn lane_statuses(&self) -> [LaneStatus; LANE_COUNT] {
        self.state.lane_statuses()
    }

    pub fn stats(&self) -> JunctionStats {
        self.state.stats()
    }

    /// The light's current phase.
    pub fn current_phase(&self) -> LightPhase {
        self.state.light().phase()
    }

    /// The road which is currently green, if any.
    pub fn active_green_road(&self) -> Option<Road> {
        self.state.light().active_green_road()
    }

    /// The normal lanes' current throughput budget.
    pub fn budget(&self) -> ThroughputBudget {
        PriorityEvaluator::new(&self.config).budget(&self.state)
    }

    /// Gets the debugging information for the previous tick as JSON.
    #[cfg(feature = "debug")]
    pub fn debug(&self) -> serde_json::Value {
        self.debug.clone()
    }

    /// Admits the pending arrivals, up to the channel's capacity.
    fn drain_arrivals(&mut self) {
        let pending = self
            .arrivals
            .try_iter()
            .take(self.config.ingest_capacity)
            .collect::<Vec<_>>();
        for event in pending {
            // Refused arrivals have already been logged.
            let _ = self.admit(event);
        }
    }

    fn advance_timers(&mut self, dt: f64) {
        self.state.advance(dt);
    }

    /// Applies any change of priority mode.
    fn update_mode(&mut self) -> Option<ModeChange> {
        let change = PriorityEvaluator::new(&self.config).evaluate(&self.state)?;
        let processed = self.state.processed_in_state();
        self.state.mode_tracker_mut().enter(change.to);
        self.state.reset_processed_in_state();

        let road = match change.to {
            PriorityMode::Priority => Some(self.config.priority_lane.road()),
            PriorityMode::Normal => None,
        };
        if let Err(violation) = self.state.light_mut().set_priority_road(road) {
            self.log.log(Level::Error, &violation.to_string());
        }

        self.log.log(
            Level::Info,
            &format!(
                "entering {} mode ({:?}) after {} departures; {} holds {} vehicles",
                change.to,
                change.cause,
                processed,
                self.config.priority_lane,
                self.state.priority_lane().len()
            ),
        );
        debug_mode_change(change);
        Some(change)
    }

    /// Releases vehicles from the lanes gated by the light.
    ///
    /// Nothing leaves a gated lane while its road is red. In normal mode each
    /// green phase releases the budget once from every lane on the green road,
    /// the priority lane included. In priority mode the priority lane is
    /// drained down to its release threshold whenever its road is green.
    fn release_gated_lanes(&mut self, departures: &mut SmallVec<[VehicleRecord; 8]>) {
        let Some(road) = self.state.light().active_green_road() else {
            self.served_green = None;
            return;
        };
        match self.state.mode() {
            PriorityMode::Normal => {
                if self.served_green == Some(road) {
                    return;
                }
                self.served_green = Some(road);
                let budget = self.budget();
                for id in self.state.gated_lane_ids(road) {
                    let released = self
                        .state
                        .lane_mut(id)
                        .dequeue_up_to(budget.vehicles_per_lane);
                    if !released.is_empty() {
                        debug_departures(id, released.len());
                        departures.extend(released);
                    }
                }
            }
            PriorityMode::Priority => {
                let lane = self.config.priority_lane;
                if road != lane.road() {
                    return;
                }
                let released = self
                    .state
                    .lane_mut(lane)
                    .drain_to(self.config.thresholds.release_to);
                if !released.is_empty() {
                    self.log.log(
                        Level::Debug,
                        &format!("released {} vehicles from {}", released.len(), lane),
                    );
                    debug_departures(lane, released.len());
                    departures.extend(released);
                }
            }
        }
    }

    /// Empties every free lane.
    fn release_free_lanes(&mut self, departures: &mut SmallVec<[VehicleRecord; 8]>) {
        for id in self.state.free_lane_ids() {
            let released = self.state.lane_mut(id).drain_to(0);
            if !released.is_empty() {
                debug_departures(id, released.len());
                departures.extend(released);
            }
        }
    }

    /// Advances the traffic light.
    fn update_light(&mut self, dt: f64) {
        let timing = PhaseTiming {
            green: self.budget().phase_duration,
            all_red: self.config.all_red_duration,
            priority_green: self.config.priority_green_duration,
        };
        match self.state.light_mut().step(dt, &timing) {
            Ok(Some(phase)) => self.log.log(Level::Debug, &format!("light is now {phase}")),
            Ok(None) => {}
            Err(violation) => self.log.log(Level::Error, &violation.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::RecentLog;
    use crate::lane::LaneId;
    use crate::vehicle::Direction;

    fn scheduler() -> (IntersectionScheduler, Arc<RecentLog>) {
        let log = Arc::new(RecentLog::silent(100));
        let (scheduler, _) =
            IntersectionScheduler::with_channel(JunctionConfig::default(), log.clone()).unwrap();
        (scheduler, log)
    }

    fn lane(name: &str) -> LaneId {
        name.parse().unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let log = Arc::new(RecentLog::silent(10));
        let mut config = JunctionConfig::default();
        config.lane_capacity = 0;
        assert!(IntersectionScheduler::with_channel(config, log).is_err());
    }

    #[test]
    fn incoming_lanes_refuse_arrivals() {
        let (mut scheduler, log) = scheduler();
        let result = scheduler.admit(ArrivalEvent::new(1, lane("CL1"), Direction::Straight));
        assert!(matches!(result, Err(LaneError::IncomingLane { vehicle: 1, .. })));
        assert_eq!(log.count(Level::Warn), 1);
        assert_eq!(scheduler.state().queued_vehicles(), 0);
    }

    #[test]
    fn eviction_is_logged() {
        let log = Arc::new(RecentLog::silent(10));
        let config = JunctionConfig {
            lane_capacity: 1,
            ..Default::default()
        };
        let (mut scheduler, _) = IntersectionScheduler::with_channel(config, log.clone()).unwrap();
        for id in 1..=2 {
            scheduler
                .admit(ArrivalEvent::new(id, lane("BL2"), Direction::Left))
                .unwrap();
        }
        assert_eq!(scheduler.state().lane(lane("BL2")).len(), 1);
        assert_eq!(log.count(Level::Warn), 1);
    }

    #[test]
    fn gated_lanes_wait_for_their_green() {
        let (mut scheduler, _) = scheduler();
        for id in 1..=2 {
            scheduler
                .admit(ArrivalEvent::new(id, lane("BL2"), Direction::Straight))
                .unwrap();
        }
        // Two vehicles over seven normal lanes: the minimum 3s phase, one vehicle per lane.
        assert_eq!(scheduler.budget().phase_duration_ms(), 3000);
        assert_eq!(scheduler.budget().vehicles_per_lane, 1);

        // All red, green A, then all red again: B is red throughout.
        for _ in 0..14 {
            let phase = scheduler.current_phase();
            assert!(scheduler.tick(0.5).departures.is_empty(), "departure during {phase}");
        }
        assert_eq!(scheduler.current_phase(), LightPhase::Green(Road::B));

        let report = scheduler.tick(0.5);
        assert_eq!(report.departures.len(), 1);
        assert_eq!(report.departures[0].id(), 1);
        assert_eq!(scheduler.stats().total_processed, 1);

        // One release per green phase.
        for _ in 0..5 {
            assert!(scheduler.tick(0.5).departures.is_empty());
        }
        assert_eq!(scheduler.current_phase(), LightPhase::AllRed);
        assert_eq!(scheduler.state().lane(lane("BL2")).len(), 1);
    }

    #[test]
    fn priority_lane_is_served_on_its_green_in_normal_mode() {
        let (mut scheduler, _) = scheduler();
        for id in 1..=3 {
            scheduler
                .admit(ArrivalEvent::new(id, LaneId::AL2, Direction::Straight))
                .unwrap();
        }
        // The priority lane does not count towards the normal lanes' budget.
        assert_eq!(scheduler.budget().avg_waiting, 0.0);

        let mut departed = vec![];
        for _ in 0..5 {
            departed.extend(scheduler.tick(0.5).departures.iter().map(|v| v.id()));
        }
        assert_eq!(scheduler.current_phase(), LightPhase::Green(Road::A));
        assert_eq!(departed, vec![1]);
        assert_eq!(scheduler.state().mode(), PriorityMode::Normal);
    }

    #[test]
    fn free_lanes_drain_every_tick() {
        let (mut scheduler, _) = scheduler();
        for id in 1..=4 {
            scheduler
                .admit(ArrivalEvent::new(id, lane("DL3"), Direction::Left))
                .unwrap();
        }
        let report = scheduler.tick(0.05);
        assert_eq!(report.departures.len(), 4);
        assert!(scheduler.state().lane(lane("DL3")).is_empty());
        assert_eq!(scheduler.stats().total_processed, 4);
    }

    #[test]
    fn arrivals_are_admitted_from_the_channel() {
        let log = Arc::new(RecentLog::silent(10));
        let (mut scheduler, sender) =
            IntersectionScheduler::with_channel(JunctionConfig::default(), log).unwrap();
        sender.offer(ArrivalEvent::new(5, lane("CL2"), Direction::Right));
        sender.offer(ArrivalEvent::new(6, lane("AL1"), Direction::Right));
        scheduler.tick(0.05);
        assert_eq!(scheduler.state().lane(lane("CL2")).len(), 1);
        assert_eq!(scheduler.state().queued_vehicles(), 1);
        assert!(sender.is_empty());
    }
}
