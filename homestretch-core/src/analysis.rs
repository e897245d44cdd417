//! Closed-form stamina budget for a whole race, without simulation or RNG.
//!
//! Early and mid race are costed at the strategy's target speed; the late race
//! and last spurt at the full spurt speed with guts applied. The final 60 m are
//! left out, matching the spurt planner.
use serde::{Deserialize, Serialize};

use crate::constants::{
    HP_PER_SECOND_SCALE, HP_VELOCITY_DIVISOR, HP_VELOCITY_OFFSET, SPURT_FINISH_BUFFER,
    hp_ground_modifier, hp_strategy_coefficient,
};
use crate::course::{CourseData, GroundCondition, Phase};
use crate::error::{Result, ensure_finite};
use crate::horse::HorseParameters;
use crate::speed::{base_target_speed, last_spurt_speed};

/// Cost of one race phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    pub phase: Phase,
    pub start_distance: f64,
    pub end_distance: f64,
    pub speed: f64,
    pub hp_consumed: f64,
    pub time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaminaAnalysis {
    pub max_hp: f64,
    pub total_hp_needed: f64,
    pub hp_remaining: f64,
    pub can_max_spurt: bool,
    /// Stamina stat needed to afford the full spurt; `None` when the strategy
    /// has no stamina coefficient.
    pub required_stamina: Option<f64>,
    pub stamina_deficit: Option<f64>,
    pub phases: Vec<PhaseBreakdown>,
    pub max_spurt_speed: f64,
    pub base_target_speed2: f64,
}

/// Summary of whether a full-speed spurt from the late race is affordable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TheoreticalMaxSpurt {
    pub can_max_spurt: bool,
    pub max_hp: f64,
    pub hp_needed_for_max_spurt: f64,
    pub max_spurt_speed: f64,
    pub base_target_speed2: f64,
    pub hp_remaining: f64,
}

pub fn stamina_analysis(
    horse: &HorseParameters,
    course: &CourseData,
    ground: GroundCondition,
) -> Result<StaminaAnalysis> {
    let distance = course.distance;
    let base = course.base_speed();
    let ground_modifier = hp_ground_modifier(course.surface, ground);
    let guts_modifier = 1.0 + 200.0 / (600.0 * horse.guts).sqrt();
    let coefficient = hp_strategy_coefficient(horse.strategy);
    let max_hp = ensure_finite("max_hp", 0.8 * coefficient * horse.stamina + distance)?;
    let base_target_speed2 = base_target_speed(horse, base, Phase::LateRace);
    let max_spurt_speed = ensure_finite("max_spurt_speed", last_spurt_speed(horse, base))?;

    let hp_per_second = |velocity: f64, late: bool| {
        let excess = velocity - base + HP_VELOCITY_OFFSET;
        let guts = if late { guts_modifier } else { 1.0 };
        HP_PER_SECOND_SCALE * excess * excess / HP_VELOCITY_DIVISOR * ground_modifier * guts
    };

    let mut phases = Vec::with_capacity(Phase::ALL.len());
    for phase in Phase::ALL {
        let start = course.phase_start(phase);
        let end = course.phase_end(phase);
        let mut length = end - start;
        if phase == Phase::LastSpurt {
            length -= SPURT_FINISH_BUFFER;
        }
        let speed = if phase.is_late() {
            max_spurt_speed
        } else {
            base_target_speed(horse, base, phase)
        };
        let time_seconds = length / speed;
        let hp_consumed = ensure_finite(
            "phase_hp",
            hp_per_second(speed, phase.is_late()) * time_seconds,
        )?;
        phases.push(PhaseBreakdown {
            phase,
            start_distance: start,
            end_distance: end,
            speed,
            hp_consumed,
            time_seconds,
        });
    }

    let total_hp_needed: f64 = phases.iter().map(|p| p.hp_consumed).sum();
    let hp_remaining = max_hp - total_hp_needed;
    let required_stamina = (coefficient > 0.0)
        .then(|| ((total_hp_needed - distance) / (0.8 * coefficient)).ceil());
    let stamina_deficit = required_stamina.map(|required| (required - horse.stamina).max(0.0));

    Ok(StaminaAnalysis {
        max_hp,
        total_hp_needed,
        hp_remaining,
        can_max_spurt: hp_remaining >= 0.0,
        required_stamina,
        stamina_deficit,
        phases,
        max_spurt_speed,
        base_target_speed2,
    })
}

pub fn theoretical_max_spurt(
    horse: &HorseParameters,
    course: &CourseData,
    ground: GroundCondition,
) -> Result<TheoreticalMaxSpurt> {
    let analysis = stamina_analysis(horse, course, ground)?;
    Ok(TheoreticalMaxSpurt {
        can_max_spurt: analysis.can_max_spurt,
        max_hp: analysis.max_hp,
        hp_needed_for_max_spurt: analysis.total_hp_needed,
        max_spurt_speed: analysis.max_spurt_speed,
        base_target_speed2: analysis.base_target_speed2,
        hp_remaining: analysis.hp_remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::Strategy;

    #[test]
    fn phases_cover_the_course_minus_the_buffer() {
        let course = CourseData::default();
        let analysis =
            stamina_analysis(&HorseParameters::default(), &course, GroundCondition::Firm).unwrap();
        assert_eq!(analysis.phases.len(), 4);
        let costed: f64 = analysis
            .phases
            .iter()
            .map(|p| p.speed * p.time_seconds)
            .sum();
        assert!((costed - (course.distance - 60.0)).abs() < 1e-6);
        assert!(analysis.phases[2].hp_consumed > 0.0);
    }

    #[test]
    fn required_stamina_closes_the_gap() {
        let horse = HorseParameters::default().with_stamina(400.0);
        let course = CourseData::default();
        let analysis = stamina_analysis(&horse, &course, GroundCondition::Firm).unwrap();
        assert!(!analysis.can_max_spurt);
        let required = analysis.required_stamina.unwrap();
        assert!(analysis.stamina_deficit.unwrap() > 0.0);

        let fixed = stamina_analysis(
            &horse.clone().with_stamina(required),
            &course,
            GroundCondition::Firm,
        )
        .unwrap();
        assert!(fixed.can_max_spurt);
        assert!(fixed.stamina_deficit.unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn unclassified_strategy_has_no_stamina_target() {
        let horse = HorseParameters::default().with_strategy(Strategy::Other);
        let analysis =
            stamina_analysis(&horse, &CourseData::default(), GroundCondition::Firm).unwrap();
        assert!(analysis.required_stamina.is_none());
        assert!((analysis.max_hp - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn theoretical_summary_matches_analysis() {
        let horse = HorseParameters::default();
        let course = CourseData::default();
        let summary = theoretical_max_spurt(&horse, &course, GroundCondition::Good).unwrap();
        let analysis = stamina_analysis(&horse, &course, GroundCondition::Good).unwrap();
        assert_eq!(summary.can_max_spurt, analysis.can_max_spurt);
        assert!((summary.hp_needed_for_max_spurt - analysis.total_hp_needed).abs() < 1e-9);
    }
}
