//! Target-speed formulas shared by the policies, the analysis and the sampler.

use crate::constants::{SPEED_STRATEGY_PHASE_COEFFICIENT, distance_aptitude_modifier};
use crate::course::Phase;
use crate::horse::HorseParameters;

/// Wisdom-independent target speed for a phase. The last spurt phase uses the late-race row.
#[must_use]
pub fn base_target_speed(horse: &HorseParameters, course_base_speed: f64, phase: Phase) -> f64 {
    let row = SPEED_STRATEGY_PHASE_COEFFICIENT[horse.strategy.index()];
    let coefficient = row[phase.index().min(2)];
    let speed_bonus = if phase.is_late() {
        speed_stat_bonus(horse)
    } else {
        0.0
    };
    course_base_speed * coefficient + speed_bonus
}

/// Maximum last-spurt speed, including the guts term.
#[must_use]
pub fn last_spurt_speed(horse: &HorseParameters, course_base_speed: f64) -> f64 {
    let late = base_target_speed(horse, course_base_speed, Phase::LateRace);
    (late + 0.01 * course_base_speed) * 1.05
        + speed_stat_bonus(horse)
        + (450.0 * horse.guts).powf(0.597) * 0.0001
}

/// Floor speed a runner falls back to once HP is exhausted.
#[must_use]
pub fn minimum_speed(horse: &HorseParameters, course_base_speed: f64) -> f64 {
    0.85 * course_base_speed + (200.0 * horse.guts).sqrt() * 0.001
}

fn speed_stat_bonus(horse: &HorseParameters) -> f64 {
    (500.0 * horse.speed).sqrt() * distance_aptitude_modifier(horse.distance_aptitude) * 0.002
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::{Aptitude, Strategy};

    #[test]
    fn late_target_speed_adds_speed_stat_term() {
        let horse = HorseParameters::default();
        let expected = 20.0 * 0.975 + (500.0_f64 * 1200.0).sqrt() * 1.0 * 0.002;
        assert!((base_target_speed(&horse, 20.0, Phase::LateRace) - expected).abs() < 1e-9);
        assert!((base_target_speed(&horse, 20.0, Phase::EarlyRace) - 20.0 * 0.978).abs() < 1e-9);
    }

    #[test]
    fn spurt_speed_exceeds_late_target() {
        for strategy in Strategy::ALL {
            let horse = HorseParameters::default().with_strategy(strategy);
            assert!(
                last_spurt_speed(&horse, 20.0) > base_target_speed(&horse, 20.0, Phase::LateRace)
            );
        }
    }

    #[test]
    fn poor_aptitude_slows_the_spurt() {
        let good = HorseParameters::default();
        let poor = HorseParameters {
            distance_aptitude: Aptitude::G,
            ..HorseParameters::default()
        };
        assert!(last_spurt_speed(&poor, 20.0) < last_spurt_speed(&good, 20.0));
    }
}
