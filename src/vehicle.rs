use crate::lane::LaneId;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The movement a vehicle makes through the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    Straight,
    Left,
    Right,
}

impl Direction {
    /// Parses the single-character direction code (`S`, `L` or `R`).
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'S' => Some(Direction::Straight),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }

    /// The single-character direction code.
    pub fn code(self) -> char {
        match self {
            Direction::Straight => 'S',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Straight => "STRAIGHT",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        })
    }
}

/// A vehicle waiting in one of the junction's lanes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleRecord {
    /// The vehicle's ID, assigned by the ingestion source.
    id: u32,
    /// The movement the vehicle will make.
    direction: Direction,
    /// The lane the vehicle is queued in.
    lane: LaneId,
    /// The simulation time at which the vehicle was enqueued, in s.
    arrival_time: f64,
    /// The time spent waiting in the queue, in s.
    wait_time: f64,
    /// Whether this is an emergency vehicle.
    /// This is carried for observers only and does not affect scheduling.
    emergency: bool,
}

impl VehicleRecord {
    /// Creates a new vehicle record.
    pub fn new(id: u32, lane: LaneId, direction: Direction, arrival_time: f64) -> Self {
        Self {
            id,
            direction,
            lane,
            arrival_time,
            wait_time: 0.0,
            emergency: false,
        }
    }

    /// Marks the vehicle as an emergency vehicle.
    pub fn with_emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lane(&self) -> LaneId {
        self.lane
    }

    /// The simulation time at which the vehicle joined its queue, in s.
    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    /// The time the vehicle has spent queued, in s.
    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    /// Adds `dt` seconds to the vehicle's wait time.
    pub(crate) fn accrue_wait(&mut self, dt: f64) {
        self.wait_time += dt;
    }
}
