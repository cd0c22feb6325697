use super::ArrivalEvent;
use crate::lane::{LaneId, LaneKind, LANE_COUNT};
use crate::vehicle::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

/// Arrival rate of the priority lane, in vehicles per second.
const PRIORITY_LANE_RATE: f64 = 0.075;
/// Arrival rate of the other slot 2 lanes, in vehicles per second.
const NORMAL_LANE_RATE: f64 = 0.06;
/// Arrival rate of the free lanes, in vehicles per second.
const FREE_LANE_RATE: f64 = 0.05;

const PRIORITY_LANE_CAP: usize = 15;
const NORMAL_LANE_CAP: usize = 12;
const FREE_LANE_CAP: usize = 8;

/// The probability that a vehicle in a slot 2 lane goes straight rather than left.
const STRAIGHT_PROBABILITY: f64 = 0.6;

/// Generates random vehicle arrivals in-process.
///
/// Each lane receives vehicles as a Poisson process. A lane receives no more
/// vehicles while its queue is at its cap, and incoming lanes never receive any.
#[derive(Clone, Debug)]
pub struct TrafficGenerator<R = StdRng> {
    rng: R,
    priority_lane: LaneId,
    /// The time until each lane's next arrival, in s.
    next_arrival: [f64; LANE_COUNT],
    next_id: u32,
}

impl TrafficGenerator<StdRng> {
    /// Creates a generator with a reproducible sequence of arrivals.
    pub fn seeded(seed: u64, priority_lane: LaneId) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), priority_lane)
    }

    /// Creates a generator seeded from the operating system.
    pub fn from_entropy(priority_lane: LaneId) -> Self {
        Self::with_rng(StdRng::from_entropy(), priority_lane)
    }
}

impl<R: Rng> TrafficGenerator<R> {
    pub fn with_rng(rng: R, priority_lane: LaneId) -> Self {
        let mut generator = Self {
            rng,
            priority_lane,
            next_arrival: [f64::INFINITY; LANE_COUNT],
            next_id: 1,
        };
        for lane in LaneId::ALL {
            let gap = generator.sample_gap(lane);
            generator.next_arrival[lane.index()] = gap;
        }
        generator
    }

    /// The mean number of arrivals per second in the given lane.
    pub fn spawn_rate(&self, lane: LaneId) -> f64 {
        match lane.kind() {
            LaneKind::Incoming => 0.0,
            LaneKind::Gated if lane == self.priority_lane => PRIORITY_LANE_RATE,
            LaneKind::Gated => NORMAL_LANE_RATE,
            LaneKind::Free => FREE_LANE_RATE,
        }
    }

    /// The queue length at which the given lane stops receiving vehicles.
    pub fn spawn_cap(&self, lane: LaneId) -> usize {
        match lane.kind() {
            LaneKind::Incoming => 0,
            LaneKind::Gated if lane == self.priority_lane => PRIORITY_LANE_CAP,
            LaneKind::Gated => NORMAL_LANE_CAP,
            LaneKind::Free => FREE_LANE_CAP,
        }
    }

    /// Advances the generator by `dt` seconds, returning the arrivals that took place.
    ///
    /// `queued` holds the current queue length of each lane, indexed by [LaneId::index].
    pub fn advance(&mut self, dt: f64, queued: &[usize; LANE_COUNT]) -> Vec<ArrivalEvent> {
        let mut events = vec![];
        for lane in LaneId::ALL {
            let idx = lane.index();
            let cap = self.spawn_cap(lane);
            let mut count = queued[idx];
            self.next_arrival[idx] -= dt;
            while self.next_arrival[idx] <= 0.0 {
                if count < cap {
                    let direction = self.sample_direction(lane);
                    events.push(ArrivalEvent::new(self.next_id, lane, direction));
                    self.next_id = self.next_id.wrapping_add(1);
                    count += 1;
                }
                let gap = self.sample_gap(lane);
                self.next_arrival[idx] += gap;
            }
        }
        events
    }

    /// Samples the time between two arrivals in the given lane.
    fn sample_gap(&mut self, lane: LaneId) -> f64 {
        let rate = self.spawn_rate(lane);
        if rate > 0.0 {
            let gap: f64 = self.rng.sample(Exp1);
            gap / rate
        } else {
            f64::INFINITY
        }
    }

    fn sample_direction(&mut self, lane: LaneId) -> Direction {
        match lane.kind() {
            LaneKind::Free => Direction::Left,
            _ if self.rng.gen_bool(STRAIGHT_PROBABILITY) => Direction::Straight,
            _ => Direction::Left,
        }
    }
}
