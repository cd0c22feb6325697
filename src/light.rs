use crate::error::InvariantViolation;
use crate::lane::Road;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The junction's traffic light controller.
///
/// At most one road is green at any time, and every change between two greens
/// passes through [LightPhase::AllRed].
#[derive(Clone, Debug)]
pub struct LightPhaseStateMachine {
    /// The current phase.
    phase: LightPhase,
    /// The road to turn green once the current all-red phase ends.
    upcoming: Road,
    /// The time since the current phase was entered, in s.
    since: f64,
    /// The road being served exclusively while priority mode is active.
    priority_road: Option<Road>,
}

/// A phase of the traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightPhase {
    /// Every road is red.
    AllRed,
    /// The given road is green and all others are red.
    Green(Road),
}

/// Phase durations used when stepping the light, in s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseTiming {
    /// The duration of a normal green phase.
    pub green: f64,
    /// The duration of the all-red clearance phase.
    pub all_red: f64,
    /// The duration of the priority road's green phase in priority mode.
    pub priority_green: f64,
}

impl LightPhase {
    pub fn is_green(self) -> bool {
        matches!(self, LightPhase::Green(_))
    }

    /// The road which is green in this phase.
    pub fn green_road(self) -> Option<Road> {
        match self {
            LightPhase::AllRed => None,
            LightPhase::Green(road) => Some(road),
        }
    }
}

impl fmt::Display for LightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightPhase::AllRed => f.write_str("ALL_RED"),
            LightPhase::Green(road) => write!(f, "{road}_GREEN"),
        }
    }
}

impl Default for LightPhaseStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LightPhaseStateMachine {
    /// Creates a light showing all red, which will turn road A green first.
    pub fn new() -> Self {
        Self {
            phase: LightPhase::AllRed,
            upcoming: Road::A,
            since: 0.0,
            priority_road: None,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> LightPhase {
        self.phase
    }

    /// The phase that will follow the current one.
    pub fn next_phase(&self) -> LightPhase {
        match self.phase {
            LightPhase::Green(_) => LightPhase::AllRed,
            LightPhase::AllRed => LightPhase::Green(self.priority_road.unwrap_or(self.upcoming)),
        }
    }

    /// The time spent in the current phase, in s.
    pub fn phase_timer(&self) -> f64 {
        self.since
    }

    /// The road which is currently green, if any.
    pub fn active_green_road(&self) -> Option<Road> {
        self.phase.green_road()
    }

    /// The road being served exclusively, if the priority override is active.
    pub fn priority_road(&self) -> Option<Road> {
        self.priority_road
    }

    /// Starts or stops serving a single road exclusively.
    ///
    /// Starting the override immediately moves the light towards the road's
    /// green phase. Stopping it resumes the round robin with the following road.
    pub fn set_priority_road(&mut self, road: Option<Road>) -> Result<(), InvariantViolation> {
        let previous = std::mem::replace(&mut self.priority_road, road);
        match (previous, road) {
            (_, Some(road)) => self.force_toward(road),
            (Some(prev), None) => {
                if self.phase == LightPhase::AllRed && self.upcoming == prev {
                    self.upcoming = prev.next();
                }
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    /// Moves the light towards the given road's green phase as quickly as
    /// is safe: straight to green from all red, or to all red from another green.
    pub fn force_toward(&mut self, road: Road) -> Result<(), InvariantViolation> {
        self.upcoming = road;
        match self.phase {
            LightPhase::Green(current) if current == road => Ok(()),
            LightPhase::Green(_) => self.transition(LightPhase::AllRed),
            LightPhase::AllRed => self.transition(LightPhase::Green(road)),
        }
    }

    /// Advances the light timing by `dt` seconds.
    /// Returns the new phase if a transition took place.
    pub fn step(
        &mut self,
        dt: f64,
        timing: &PhaseTiming,
    ) -> Result<Option<LightPhase>, InvariantViolation> {
        self.since += dt;
        if self.since < self.duration(timing) {
            return Ok(None);
        }
        let next = match self.phase {
            LightPhase::Green(road) => {
                self.upcoming = self.priority_road.unwrap_or_else(|| road.next());
                LightPhase::AllRed
            }
            LightPhase::AllRed => LightPhase::Green(self.priority_road.unwrap_or(self.upcoming)),
        };
        self.transition(next)?;
        Ok(Some(next))
    }

    /// The duration of the current phase.
    fn duration(&self, timing: &PhaseTiming) -> f64 {
        match self.phase {
            LightPhase::AllRed => timing.all_red,
            LightPhase::Green(road) if Some(road) == self.priority_road => timing.priority_green,
            LightPhase::Green(_) => timing.green,
        }
    }

    /// Enters a new phase, refusing any direct change between two greens.
    fn transition(&mut self, next: LightPhase) -> Result<(), InvariantViolation> {
        if self.phase.is_green() && next.is_green() {
            let violation =
                InvariantViolation(format!("light cannot change from {} to {}", self.phase, next));
            debug_assert!(false, "{}", violation);
            return Err(violation);
        }
        self.phase = next;
        self.since = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: PhaseTiming = PhaseTiming {
        green: 3.0,
        all_red: 2.0,
        priority_green: 6.0,
    };

    #[test]
    fn round_robin_order() {
        let mut light = LightPhaseStateMachine::new();
        let mut phases = vec![light.phase()];
        for _ in 0..9 {
            // Each phase lasts at most 3 seconds.
            for _ in 0..6 {
                if let Some(phase) = light.step(0.5, &TIMING).unwrap() {
                    phases.push(phase);
                    break;
                }
            }
        }
        use LightPhase::*;
        assert_eq!(
            phases,
            vec![
                AllRed,
                Green(Road::A),
                AllRed,
                Green(Road::B),
                AllRed,
                Green(Road::C),
                AllRed,
                Green(Road::D),
                AllRed,
                Green(Road::A),
            ]
        );
    }

    #[test]
    fn next_phase_after_green() {
        let mut light = LightPhaseStateMachine::new();
        assert_eq!(light.next_phase(), LightPhase::Green(Road::A));
        light.step(2.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::A));
        assert_eq!(light.next_phase(), LightPhase::AllRed);
        light.step(3.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::AllRed);
        assert_eq!(light.next_phase(), LightPhase::Green(Road::B));
    }

    #[test]
    fn phase_timer_resets_on_transition() {
        let mut light = LightPhaseStateMachine::new();
        light.step(1.5, &TIMING).unwrap();
        assert_eq!(light.phase_timer(), 1.5);
        light.step(0.5, &TIMING).unwrap();
        assert_eq!(light.phase_timer(), 0.0);
    }

    #[test]
    fn force_from_other_green_passes_through_all_red() {
        let mut light = LightPhaseStateMachine::new();
        light.step(2.0, &TIMING).unwrap();
        light.step(3.0, &TIMING).unwrap();
        light.step(2.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::B));

        light.set_priority_road(Some(Road::A)).unwrap();
        assert_eq!(light.phase(), LightPhase::AllRed);
        assert_eq!(light.next_phase(), LightPhase::Green(Road::A));

        light.step(2.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::A));
    }

    #[test]
    fn force_from_all_red_is_immediate() {
        let mut light = LightPhaseStateMachine::new();
        light.set_priority_road(Some(Road::C)).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::C));
    }

    #[test]
    fn priority_override_recurs_with_extended_green() {
        let mut light = LightPhaseStateMachine::new();
        light.set_priority_road(Some(Road::A)).unwrap();

        // The extended green outlasts a normal green.
        light.step(5.5, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::A));
        light.step(0.5, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::AllRed);
        assert_eq!(light.next_phase(), LightPhase::Green(Road::A));
        light.step(2.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::A));
    }

    #[test]
    fn rotation_resumes_after_priority_road() {
        let mut light = LightPhaseStateMachine::new();
        light.set_priority_road(Some(Road::A)).unwrap();
        light.step(6.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::AllRed);

        light.set_priority_road(None).unwrap();
        assert_eq!(light.next_phase(), LightPhase::Green(Road::B));
        light.step(2.0, &TIMING).unwrap();
        assert_eq!(light.phase(), LightPhase::Green(Road::B));
    }

    #[test]
    fn display_names() {
        assert_eq!(LightPhase::AllRed.to_string(), "ALL_RED");
        assert_eq!(LightPhase::Green(Road::D).to_string(), "D_GREEN");
    }
}
