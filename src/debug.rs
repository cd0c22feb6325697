#[cfg(feature = "debug")]
use crate::junction::JunctionState;
use crate::lane::LaneId;
use crate::light::LightPhase;
use crate::priority::ModeChange;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

#[allow(unused)]
pub fn debug_departures(lane: LaneId, count: usize) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "departures",
            "lane": lane.to_string(),
            "count": count,
        }))
    })
}

#[allow(unused)]
pub fn debug_mode_change(change: ModeChange) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "mode",
            "to": change.to.to_string(),
            "cause": format!("{:?}", change.cause),
        }))
    })
}

#[allow(unused)]
pub fn debug_phase(phase: LightPhase) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "phase",
            "phase": phase.to_string(),
        }))
    })
}

#[cfg(feature = "debug")]
pub fn take_debug_frame(state: &JunctionState) -> serde_json::Value {
    let light = state.light();
    json!({
        "clock": state.clock(),
        "mode": state.mode().to_string(),
        "state_timer": state.state_timer(),
        "processed_in_state": state.processed_in_state(),
        "phase": light.phase().to_string(),
        "next_phase": light.next_phase().to_string(),
        "phase_timer": light.phase_timer(),
        "lanes": state.lane_statuses(),
        "stats": state.stats(),
        "events": DEBUG_FRAME.with(|frame| frame.take()),
    })
}
