//! Vehicle arrivals from outside the scheduler.
//!
//! Producers (lane files, the in-process generator, or any other thread) hand
//! [ArrivalEvent]s to the scheduler through a bounded channel which is drained
//! at the start of every tick.

pub use channel::{arrival_channel, ArrivalReceiver, ArrivalSender, OverflowPolicy};
pub use files::LaneFileSource;
pub use generator::TrafficGenerator;
pub use parse::{parse_lane_record, parse_lines, parse_road_record, LineFormat};
pub use poller::{FilePoller, FILE_CHECK_INTERVAL};

use crate::lane::LaneId;
use crate::vehicle::{Direction, VehicleRecord};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod channel;
mod files;
mod generator;
mod parse;
mod poller;

/// A vehicle arriving at the back of one of the junction's lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrivalEvent {
    pub vehicle_id: u32,
    pub lane: LaneId,
    pub direction: Direction,
    pub emergency: bool,
}

impl ArrivalEvent {
    /// Creates an arrival for an ordinary vehicle.
    pub fn new(vehicle_id: u32, lane: LaneId, direction: Direction) -> Self {
        Self {
            vehicle_id,
            lane,
            direction,
            emergency: false,
        }
    }

    /// Converts the arrival into a queued vehicle record.
    pub fn into_record(self, arrival_time: f64) -> VehicleRecord {
        VehicleRecord::new(self.vehicle_id, self.lane, self.direction, arrival_time)
            .with_emergency(self.emergency)
    }
}
