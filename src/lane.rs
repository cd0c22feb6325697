use crate::config::PriorityThresholds;
use crate::error::LaneError;
use crate::vehicle::VehicleRecord;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The number of lanes in the junction.
pub const LANE_COUNT: usize = 12;

/// The priority score reported by the priority lane while it is being prioritised.
pub const PRIORITY_SCORE: u32 = 100;

/// One of the four approaches into the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Road {
    A,
    B,
    C,
    D,
}

impl Road {
    /// All roads, in round-robin order.
    pub const ALL: [Road; 4] = [Road::A, Road::B, Road::C, Road::D];

    /// The road served after this one in the round robin.
    pub fn next(self) -> Road {
        match self {
            Road::A => Road::B,
            Road::B => Road::C,
            Road::C => Road::D,
            Road::D => Road::A,
        }
    }

    /// Parses a road letter, ignoring case.
    pub fn from_letter(letter: char) -> Option<Road> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Road::A),
            'B' => Some(Road::B),
            'C' => Some(Road::C),
            'D' => Some(Road::D),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Road::A => 'A',
            Road::B => 'B',
            Road::C => 'C',
            Road::D => 'D',
        }
    }
}

impl fmt::Display for Road {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The role of a lane within its road, numbered from the kerb outwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LaneKind {
    /// Slot 1: carries traffic into the junction; vehicles never spawn here.
    Incoming,
    /// Slot 2: gated by the traffic light. Hosts the priority lane.
    Gated,
    /// Slot 3: a slip lane that is never gated by the light.
    Free,
}

impl LaneKind {
    pub const ALL: [LaneKind; 3] = [LaneKind::Incoming, LaneKind::Gated, LaneKind::Free];

    /// Gets the lane kind from its slot number (1, 2 or 3).
    pub fn from_slot(slot: u8) -> Option<LaneKind> {
        match slot {
            1 => Some(LaneKind::Incoming),
            2 => Some(LaneKind::Gated),
            3 => Some(LaneKind::Free),
            _ => None,
        }
    }

    pub fn slot(self) -> u8 {
        match self {
            LaneKind::Incoming => 1,
            LaneKind::Gated => 2,
            LaneKind::Free => 3,
        }
    }
}

/// Identifies one of the twelve lanes of the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneId {
    road: Road,
    kind: LaneKind,
}

impl LaneId {
    /// All lanes, ordered by road and then by slot.
    pub const ALL: [LaneId; LANE_COUNT] = {
        use LaneKind::*;
        use Road::*;
        [
            LaneId::new(A, Incoming),
            LaneId::new(A, Gated),
            LaneId::new(A, Free),
            LaneId::new(B, Incoming),
            LaneId::new(B, Gated),
            LaneId::new(B, Free),
            LaneId::new(C, Incoming),
            LaneId::new(C, Gated),
            LaneId::new(C, Free),
            LaneId::new(D, Incoming),
            LaneId::new(D, Gated),
            LaneId::new(D, Free),
        ]
    };

    /// The conventional priority lane, "AL2".
    pub const AL2: LaneId = LaneId::new(Road::A, LaneKind::Gated);

    pub const fn new(road: Road, kind: LaneKind) -> Self {
        Self { road, kind }
    }

    /// Creates a lane ID from a road and a slot number (1, 2 or 3).
    pub fn from_slot(road: Road, slot: u8) -> Option<Self> {
        LaneKind::from_slot(slot).map(|kind| Self::new(road, kind))
    }

    pub fn road(self) -> Road {
        self.road
    }

    pub fn kind(self) -> LaneKind {
        self.kind
    }

    /// The lane's slot number (1, 2 or 3).
    pub fn slot(self) -> u8 {
        self.kind.slot()
    }

    /// The position of the lane in [LaneId::ALL].
    pub fn index(self) -> usize {
        3 * self.road as usize + (self.slot() as usize - 1)
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}L{}", self.road, self.slot())
    }
}

impl FromStr for LaneId {
    type Err = String;

    /// Parses lane names such as `AL2` or `a2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let road = chars.next().and_then(Road::from_letter);
        let rest = chars.as_str();
        let rest = rest
            .strip_prefix('L')
            .or_else(|| rest.strip_prefix('l'))
            .unwrap_or(rest);
        let slot = rest.parse::<u8>().ok();
        match (road, slot) {
            (Some(road), Some(slot)) => {
                LaneId::from_slot(road, slot).ok_or_else(|| format!("invalid lane: {s}"))
            }
            _ => Err(format!("invalid lane: {s}")),
        }
    }
}

/// The result of a successful [LaneQueue::enqueue].
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// The vehicle joined the back of the queue.
    Queued,
    /// The vehicle joined the queue, which then exceeded its soft capacity;
    /// the vehicle at the tail was evicted.
    Evicted(VehicleRecord),
}

/// A first-in first-out queue of vehicles waiting in a single lane.
#[derive(Clone, Debug)]
pub struct LaneQueue {
    /// The lane ID.
    id: LaneId,
    /// Whether this is the junction's priority lane.
    priority: bool,
    /// The soft cap on the number of queued vehicles.
    capacity: usize,
    /// The queued vehicles, head (closest to the stop line) first.
    vehicles: VecDeque<VehicleRecord>,
}

impl LaneQueue {
    /// Creates an empty lane queue.
    pub fn new(id: LaneId, priority: bool, capacity: usize) -> Self {
        Self {
            id,
            priority,
            capacity: capacity.max(1),
            vehicles: VecDeque::new(),
        }
    }

    /// Gets the lane ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Whether this is the junction's designated priority lane.
    pub fn is_priority_lane(&self) -> bool {
        self.priority
    }

    /// Whether this is a free lane, which is never gated by the light.
    pub fn is_free_lane(&self) -> bool {
        self.id.kind() == LaneKind::Free
    }

    /// Whether this is a normal lane, i.e. neither the priority lane nor a free lane.
    pub fn is_normal_lane(&self) -> bool {
        !self.priority && !self.is_free_lane()
    }

    /// The soft cap on the number of queued vehicles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of queued vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// The vehicle at the head of the queue.
    pub fn peek(&self) -> Option<&VehicleRecord> {
        self.vehicles.front()
    }

    /// Iterates over the queued vehicles, head first.
    pub fn iter(&self) -> impl Iterator<Item = &VehicleRecord> + '_ {
        self.vehicles.iter()
    }

    /// The accumulated wait of the vehicle at the head of the queue, in s.
    pub fn head_wait_time(&self) -> f64 {
        self.peek().map(|v| v.wait_time()).unwrap_or(0.0)
    }

    /// Appends a vehicle to the back of the queue.
    ///
    /// If the queue grows beyond its capacity, the vehicle furthest from the
    /// stop line (the tail) is evicted and returned.
    pub fn enqueue(&mut self, vehicle: VehicleRecord) -> Result<Admission, LaneError> {
        if vehicle.lane() != self.id {
            return Err(LaneError::LaneMismatch {
                vehicle: vehicle.id(),
                expected: vehicle.lane(),
                actual: self.id,
            });
        }
        self.vehicles.push_back(vehicle);
        if self.vehicles.len() > self.capacity {
            if let Some(evicted) = self.vehicles.pop_back() {
                return Ok(Admission::Evicted(evicted));
            }
        }
        Ok(Admission::Queued)
    }

    /// Removes the vehicle at the head of the queue.
    pub fn dequeue(&mut self) -> Option<VehicleRecord> {
        self.vehicles.pop_front()
    }

    /// Removes up to `count` vehicles from the head of the queue, in order.
    pub fn dequeue_up_to(&mut self, count: usize) -> SmallVec<[VehicleRecord; 8]> {
        let count = count.min(self.vehicles.len());
        self.vehicles.drain(..count).collect()
    }

    /// Removes vehicles from the head of the queue until at most `keep` remain.
    pub fn drain_to(&mut self, keep: usize) -> SmallVec<[VehicleRecord; 8]> {
        self.dequeue_up_to(self.vehicles.len().saturating_sub(keep))
    }

    /// The lane's current priority score.
    ///
    /// Only the priority lane ever scores above zero. It starts scoring once its
    /// queue exceeds the entry threshold and, while priority mode is active,
    /// keeps scoring until the queue falls below the exit threshold.
    pub fn priority_score(&self, priority_mode: bool, thresholds: &PriorityThresholds) -> u32 {
        let len = self.len();
        let prioritised = len > thresholds.enter_above
            || (priority_mode && len >= thresholds.exit_below);
        if self.priority && prioritised {
            PRIORITY_SCORE
        } else {
            0
        }
    }

    /// Adds `dt` seconds to the wait time of every queued vehicle.
    pub(crate) fn accrue_wait(&mut self, dt: f64) {
        for vehicle in &mut self.vehicles {
            vehicle.accrue_wait(dt);
        }
    }
}
