//! Coefficient tables and tuning constants for the stamina model.
//!
//! These values reproduce the game's published formulas. They live in code,
//! indexed by enum, so the model can only change through reviewed commits.

use crate::course::{GroundCondition, Surface};
use crate::horse::{Aptitude, Strategy};

// Stamina -----------------------------------------------------------------
/// Max-HP coefficient per strategy row (`Strategy::index`).
pub const HP_STRATEGY_COEFFICIENT: [f64; 6] = [
    0.0,   // Other
    0.95,  // Front runner
    0.89,  // Pace chaser
    1.0,   // Late surger
    0.995, // End closer
    0.86,  // Runaway
];

/// Consumption multiplier by surface then going.
pub const HP_GROUND_MODIFIER: [[f64; 4]; 2] = [
    [1.0, 1.0, 1.02, 1.02], // Turf
    [1.0, 1.0, 1.01, 1.02], // Dirt
];

pub(crate) const HP_PER_SECOND_SCALE: f64 = 20.0;
pub(crate) const HP_VELOCITY_OFFSET: f64 = 12.0;
pub(crate) const HP_VELOCITY_DIVISOR: f64 = 144.0;

// Status modifiers --------------------------------------------------------
pub(crate) const STATUS_DOWNHILL: f64 = 0.4;
pub(crate) const STATUS_RUSHED: f64 = 1.6;
pub(crate) const STATUS_PACE_DOWN: f64 = 0.6;
pub(crate) const LEAD_COMPETITION_RUNAWAY_RUSHED: f64 = 7.7;
pub(crate) const LEAD_COMPETITION_RUNAWAY: f64 = 3.5;
pub(crate) const LEAD_COMPETITION_RUSHED: f64 = 3.6;
pub(crate) const LEAD_COMPETITION: f64 = 1.4;

// Speed -------------------------------------------------------------------
/// Target-speed coefficient per strategy row and phase (early, mid, late).
pub const SPEED_STRATEGY_PHASE_COEFFICIENT: [[f64; 3]; 6] = [
    [1.0, 1.0, 1.0], // Other
    [1.0, 0.98, 0.962],
    [0.978, 0.991, 0.975],
    [0.938, 0.998, 0.994],
    [0.931, 1.0, 1.0],
    [1.063, 0.962, 0.95],
];

/// Speed multiplier per distance aptitude grade (S..G).
pub const DISTANCE_APTITUDE_SPEED_MODIFIER: [f64; 8] = [1.05, 1.0, 0.9, 0.8, 0.6, 0.4, 0.2, 0.1];

// Last spurt --------------------------------------------------------------
/// Metres before the finish that the spurt budget leaves untouched.
pub const SPURT_FINISH_BUFFER: f64 = 60.0;
/// Speed spacing between successive spurt candidates.
pub const SPURT_SPEED_STEP: f64 = 0.1;
/// Exclusive upper bound of the wisdom acceptance roll.
pub const SUBPAR_ROLL_RANGE: u32 = 100_000;

// Sampler -----------------------------------------------------------------
pub const DEFAULT_FRAME_SECONDS: f64 = 1.0 / 15.0;
pub(crate) const MAX_FRAMES_PER_SAMPLE: usize = 200_000;

#[must_use]
pub const fn hp_strategy_coefficient(strategy: Strategy) -> f64 {
    HP_STRATEGY_COEFFICIENT[strategy.index()]
}

#[must_use]
pub const fn hp_ground_modifier(surface: Surface, ground: GroundCondition) -> f64 {
    HP_GROUND_MODIFIER[surface.index()][ground.index()]
}

#[must_use]
pub const fn distance_aptitude_modifier(aptitude: Aptitude) -> f64 {
    DISTANCE_APTITUDE_SPEED_MODIFIER[aptitude.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_going_costs_more_than_firm() {
        for surface in [Surface::Turf, Surface::Dirt] {
            assert!(
                hp_ground_modifier(surface, GroundCondition::Heavy)
                    > hp_ground_modifier(surface, GroundCondition::Firm)
            );
        }
        assert!((hp_ground_modifier(Surface::Dirt, GroundCondition::Soft) - 1.01).abs() < 1e-12);
    }

    #[test]
    fn strategy_rows_line_up() {
        assert!((hp_strategy_coefficient(Strategy::PaceChaser) - 0.89).abs() < 1e-12);
        assert!(
            (SPEED_STRATEGY_PHASE_COEFFICIENT[Strategy::Runaway.index()][0] - 1.063).abs() < 1e-12
        );
    }
}
