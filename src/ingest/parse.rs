//! Parsers for the two lane-file record formats.

use super::ArrivalEvent;
use crate::error::ParseError;
use crate::event_log::EventLog;
use crate::lane::{LaneId, LaneKind, Road};
use crate::vehicle::Direction;
use log::Level;

/// The prefix marking an emergency vehicle in a road file.
const EMERGENCY_PREFIX: &str = "EMG";

/// The layout of a lane file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineFormat {
    /// A file dedicated to one lane, holding `<id>,<direction>;` records.
    LaneFile(LaneId),
    /// A file for a whole road, holding `<id>_L<lane>[_<DIRECTION>]:<road>` records.
    RoadFile,
}

/// Parses a single `<id>,<direction>` record, without its trailing `;`.
pub fn parse_lane_record(record: &str, lane: LaneId) -> Result<ArrivalEvent, ParseError> {
    let (id, direction) = record
        .split_once(',')
        .ok_or_else(|| ParseError::MissingSeparator {
            separator: ',',
            line: record.to_owned(),
        })?;
    let vehicle_id = id
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidVehicleId(id.to_owned()))?;
    let direction = {
        let code = direction.trim();
        let mut chars = code.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Direction::from_code(c),
            _ => None,
        }
        .ok_or_else(|| ParseError::InvalidDirection(code.to_owned()))?
    };
    if lane.kind() == LaneKind::Incoming {
        return Err(ParseError::IncomingLane(lane));
    }
    Ok(ArrivalEvent::new(vehicle_id, lane, direction))
}

/// Parses a `<id>_L<lane>[_<DIRECTION>]:<road>` record.
///
/// The vehicle ID may carry an alphabetic prefix such as `V12`; an `EMG`
/// prefix marks an emergency vehicle. Without a direction, vehicles in lane 3
/// turn left and vehicles in lane 2 go straight.
pub fn parse_road_record(line: &str) -> Result<ArrivalEvent, ParseError> {
    let line = line.trim();
    let (vehicle, road) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MissingSeparator {
            separator: ':',
            line: line.to_owned(),
        })?;

    let road = {
        let letter = road.trim();
        let mut chars = letter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Road::from_letter(c),
            _ => None,
        }
        .ok_or_else(|| ParseError::InvalidRoad(letter.to_owned()))?
    };

    let mut parts = vehicle.split('_');
    let id = parts.next().unwrap_or_default();
    let emergency = id.starts_with(EMERGENCY_PREFIX);
    let digits = id.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let vehicle_id = digits
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidVehicleId(id.to_owned()))?;

    let lane_token = parts.next().unwrap_or_default();
    let lane = lane_token
        .strip_prefix('L')
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(|n| LaneId::from_slot(road, n))
        .ok_or_else(|| ParseError::InvalidLaneNumber(lane_token.to_owned()))?;

    let direction = match (parts.next(), parts.next()) {
        (None, _) => match lane.kind() {
            LaneKind::Free => Direction::Left,
            _ => Direction::Straight,
        },
        (Some("LEFT"), None) => Direction::Left,
        (Some("STRAIGHT"), None) => Direction::Straight,
        (Some("RIGHT"), None) => Direction::Right,
        (Some(word), _) => return Err(ParseError::InvalidDirection(word.to_owned())),
    };

    if lane.kind() == LaneKind::Incoming {
        return Err(ParseError::IncomingLane(lane));
    }
    Ok(ArrivalEvent {
        vehicle_id,
        lane,
        direction,
        emergency,
    })
}

/// Parses every complete line of `text`. Blank lines are skipped; malformed
/// records are skipped and reported at WARN.
pub fn parse_lines(text: &str, format: LineFormat, log: &dyn EventLog) -> Vec<ArrivalEvent> {
    let mut events = vec![];
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match format {
            LineFormat::RoadFile => match parse_road_record(line) {
                Ok(event) => events.push(event),
                Err(err) => warn_skipped(log, &err),
            },
            LineFormat::LaneFile(lane) => {
                let Some(records) = line.strip_suffix(';') else {
                    warn_skipped(log, &ParseError::Unterminated(line.to_owned()));
                    continue;
                };
                for record in records.split(';').map(str::trim).filter(|r| !r.is_empty()) {
                    match parse_lane_record(record, lane) {
                        Ok(event) => events.push(event),
                        Err(err) => warn_skipped(log, &err),
                    }
                }
            }
        }
    }
    events
}

fn warn_skipped(log: &dyn EventLog, err: &ParseError) {
    log.log(Level::Warn, &format!("skipping malformed record: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::RecentLog;

    fn lane(name: &str) -> LaneId {
        name.parse().unwrap()
    }

    #[test]
    fn lane_records() {
        let event = parse_lane_record("42,L", lane("BL2")).unwrap();
        assert_eq!(event, ArrivalEvent::new(42, lane("BL2"), Direction::Left));
        assert_eq!(
            parse_lane_record(" 7 , S ", lane("AL3")).map(|e| e.direction),
            Ok(Direction::Straight)
        );
        assert!(matches!(
            parse_lane_record("42", lane("BL2")),
            Err(ParseError::MissingSeparator { separator: ',', .. })
        ));
        assert!(matches!(
            parse_lane_record("x,S", lane("BL2")),
            Err(ParseError::InvalidVehicleId(_))
        ));
        assert!(matches!(
            parse_lane_record("3,Q", lane("BL2")),
            Err(ParseError::InvalidDirection(_))
        ));
        assert_eq!(
            parse_lane_record("3,S", lane("BL1")),
            Err(ParseError::IncomingLane(lane("BL1")))
        );
    }

    #[test]
    fn road_records() {
        let event = parse_road_record("V12_L2_LEFT:A").unwrap();
        assert_eq!(event, ArrivalEvent::new(12, LaneId::AL2, Direction::Left));

        let event = parse_road_record("EMG7_L3:C").unwrap();
        assert_eq!(event.vehicle_id, 7);
        assert_eq!(event.lane, lane("CL3"));
        assert_eq!(event.direction, Direction::Left);
        assert!(event.emergency);

        assert_eq!(
            parse_road_record("31_L2:d").map(|e| (e.lane, e.direction)),
            Ok((lane("DL2"), Direction::Straight))
        );
    }

    #[test]
    fn malformed_road_records() {
        assert!(matches!(
            parse_road_record("garbage_no_colon"),
            Err(ParseError::MissingSeparator { separator: ':', .. })
        ));
        assert!(matches!(
            parse_road_record("V1_L2:E"),
            Err(ParseError::InvalidRoad(_))
        ));
        assert!(matches!(
            parse_road_record("V1_L4:A"),
            Err(ParseError::InvalidLaneNumber(_))
        ));
        assert!(matches!(
            parse_road_record("V1:A"),
            Err(ParseError::InvalidLaneNumber(_))
        ));
        assert!(matches!(
            parse_road_record("V1_L2_BACKWARDS:A"),
            Err(ParseError::InvalidDirection(_))
        ));
        assert!(matches!(
            parse_road_record("VX_L2:A"),
            Err(ParseError::InvalidVehicleId(_))
        ));
        assert_eq!(
            parse_road_record("V1_L1:B"),
            Err(ParseError::IncomingLane(lane("BL1")))
        );
    }

    #[test]
    fn lines_skip_blank_and_malformed() {
        let log = RecentLog::silent(10);
        let text = "V1_L2:A\n\n   \ngarbage_no_colon\nV2_L3_RIGHT:B\n";
        let events = parse_lines(text, LineFormat::RoadFile, &log);
        assert_eq!(
            events.iter().map(|e| e.vehicle_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(log.count(Level::Warn), 1);
    }

    #[test]
    fn lane_file_lines_hold_several_records() {
        let log = RecentLog::silent(10);
        let text = "1,S;2,L;\n3,R;\n4,S\n5,Q;\n";
        let events = parse_lines(text, LineFormat::LaneFile(lane("CL2")), &log);
        assert_eq!(
            events.iter().map(|e| e.vehicle_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(events.iter().all(|e| e.lane == lane("CL2")));
        // One unterminated line and one bad direction.
        assert_eq!(log.count(Level::Warn), 2);
    }
}
