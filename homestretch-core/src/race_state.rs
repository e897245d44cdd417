//! Per-tick runner snapshot handed to the stamina policies by the race driver.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::course::Phase;
use crate::horse::Strategy;

/// Position-keep mode active for the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKeepState {
    #[default]
    None,
    PaceUp,
    PaceDown,
    SpeedUp,
    Overtake,
}

/// Read-only view of one runner at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    pub pos: f64,
    pub phase: Phase,
    pub current_speed: f64,
    #[serde(default)]
    pub position_keep_state: PositionKeepState,
    #[serde(default)]
    pub is_rushed: bool,
    #[serde(default)]
    pub is_downhill_mode: bool,
    #[serde(default)]
    pub lead_competition: bool,
    #[serde(default)]
    pub pos_keep_strategy: Strategy,
    // Bookkeeping owned by the race driver.
    #[serde(default)]
    pub used_skills: BTreeSet<u32>,
    #[serde(default)]
    pub random_lot: u32,
    #[serde(default)]
    pub gate_roll: u32,
    #[serde(default)]
    pub start_delay: f64,
}

impl Default for RaceState {
    fn default() -> Self {
        Self {
            pos: 0.0,
            phase: Phase::EarlyRace,
            current_speed: 15.0,
            position_keep_state: PositionKeepState::None,
            is_rushed: false,
            is_downhill_mode: false,
            lead_competition: false,
            pos_keep_strategy: Strategy::PaceChaser,
            used_skills: BTreeSet::new(),
            random_lot: 50,
            gate_roll: 0,
            start_delay: 0.05,
        }
    }
}

impl RaceState {
    #[must_use]
    pub fn at(pos: f64, phase: Phase) -> Self {
        Self {
            pos,
            phase,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_speed(mut self, current_speed: f64) -> Self {
        self.current_speed = current_speed;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.pos_keep_strategy = strategy;
        self
    }

    /// The state the finishing stretch is planned against: late race with no
    /// position keep and no lead competition, keeping rushed/downhill flags.
    #[must_use]
    pub fn final_leg(&self) -> Self {
        Self {
            phase: Phase::LateRace,
            position_keep_state: PositionKeepState::None,
            lead_competition: false,
            used_skills: BTreeSet::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_leg_clears_transient_pacing() {
        let mut state = RaceState::at(1400.0, Phase::MidRace);
        state.position_keep_state = PositionKeepState::PaceDown;
        state.lead_competition = true;
        state.is_rushed = true;
        let leg = state.final_leg();
        assert_eq!(leg.phase, Phase::LateRace);
        assert_eq!(leg.position_keep_state, PositionKeepState::None);
        assert!(!leg.lead_competition);
        assert!(leg.is_rushed);
        assert!((leg.pos - 1400.0).abs() < f64::EPSILON);
    }
}
