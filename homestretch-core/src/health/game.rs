use log::debug;

use crate::constants::{
    HP_VELOCITY_OFFSET, SPURT_FINISH_BUFFER, SPURT_SPEED_STEP, SUBPAR_ROLL_RANGE,
};
use crate::course::{CourseData, GroundCondition};
use crate::error::{Result, ensure_finite};
use crate::horse::HorseParameters;
use crate::numbers::{floor_f64_to_index, usize_to_f64};
use crate::race_state::RaceState;
use crate::rng::Prng;

use super::ledger::{Candidates, HpLedger, pick_rank, sort_by_time};
use super::{LastSpurtPair, SpurtParameters, StaminaPolicy};

/// The game's own stamina model: one spurt decision per request, no caching.
#[derive(Debug, Clone)]
pub struct GameStaminaPolicy<R> {
    ledger: HpLedger,
    rng: R,
    max_spurt: bool,
}

impl<R: Prng> GameStaminaPolicy<R> {
    #[must_use]
    pub fn new(course: &CourseData, ground: GroundCondition, rng: R) -> Self {
        Self {
            ledger: HpLedger::new(course, ground),
            rng,
            max_spurt: false,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &HpLedger {
        &self.ledger
    }

    /// Overwrite current HP, e.g. to script a depleted runner.
    pub fn set_hp(&mut self, hp: f64) {
        self.ledger.set_hp(hp);
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }

    /// Fastest constant speed whose drain over `remaining` metres equals current HP,
    /// clamped into `[floor, max_speed]`.
    fn safe_speed(
        &self,
        final_leg: &RaceState,
        remaining: f64,
        max_speed: f64,
        floor: f64,
    ) -> Result<f64> {
        if remaining <= 0.0 {
            return Ok(max_speed);
        }
        let hp = self.ledger.hp();
        if hp <= 0.0 {
            return Ok(floor);
        }
        // drain(v) = k * L * (v - c)^2 / v with c = base - 12; solve drain(v) = hp.
        let k_len = self.ledger.consumption_factor(final_leg)? * remaining;
        let offset = self.ledger.base_speed() - HP_VELOCITY_OFFSET;
        let discriminant = 4.0f64.mul_add(k_len * hp * offset, hp * hp).max(0.0);
        let excess = (hp + discriminant.sqrt()) / (2.0 * k_len);
        let speed = ensure_finite("safe_spurt_speed", excess + offset)?;
        Ok(speed.max(floor).min(max_speed))
    }

    fn gamble(
        &self,
        final_leg: &RaceState,
        pos: f64,
        speed: f64,
        remaining: f64,
        floor: f64,
    ) -> Result<SpurtParameters> {
        let distance = self.ledger.distance();
        let hp = self.ledger.hp();
        let floor_drain = self.ledger.hp_per_second(final_leg, floor)?;
        let spurt_drain = self.ledger.hp_per_second(final_leg, speed)?;
        // s1 * speed + s2 * floor = remaining, with the HP spent equal to the budget.
        let sustainable = (floor * hp - floor_drain * remaining)
            / (floor * spurt_drain - floor_drain * speed);
        let duration = (remaining / speed).min(ensure_finite("spurt_duration", sustainable)?.max(0.0));
        let spurt_distance = duration * speed;
        let transition = distance - spurt_distance - SPURT_FINISH_BUFFER;
        Ok(SpurtParameters {
            transition,
            speed,
            distance: distance - transition,
            time: (transition - pos) / floor + (distance - transition) / speed,
        })
    }

    /// The safe plan plus every 0.1-step gamble above it, fastest estimated
    /// finish first.
    fn candidates(
        &self,
        state: &RaceState,
        final_leg: &RaceState,
        max_speed: f64,
        floor: f64,
    ) -> Result<Candidates> {
        let distance = self.ledger.distance();
        let remaining = distance - SPURT_FINISH_BUFFER - state.pos;
        let safe = self.safe_speed(final_leg, remaining, max_speed, floor)?;
        let mut candidates = Candidates::new();
        candidates.push(SpurtParameters {
            transition: state.pos,
            speed: safe,
            distance: distance - state.pos,
            time: (distance - state.pos) / safe,
        });
        let steps = floor_f64_to_index((max_speed - safe) / SPURT_SPEED_STEP);
        for step in 1..=steps {
            let speed = (-SPURT_SPEED_STEP).mul_add(usize_to_f64(step), max_speed);
            if speed <= safe {
                break;
            }
            candidates.push(self.gamble(final_leg, state.pos, speed, remaining, floor)?);
        }
        sort_by_time(&mut candidates);
        Ok(candidates)
    }
}

impl<R: Prng> StaminaPolicy for GameStaminaPolicy<R> {
    fn init(&mut self, horse: &HorseParameters) -> Result<()> {
        self.max_spurt = false;
        self.ledger.init(horse)
    }

    fn tick(&mut self, state: &RaceState, dt: f64) -> Result<()> {
        self.ledger.consume(state, dt).map(|_| ())
    }

    fn recover(&mut self, pct: f64, _state: &RaceState) -> Result<()> {
        self.ledger.recover(pct)
    }

    fn hp(&self) -> f64 {
        self.ledger.hp()
    }

    fn max_hp(&self) -> f64 {
        self.ledger.max_hp()
    }

    fn has_remaining_hp(&self) -> bool {
        self.ledger.has_remaining_hp()
    }

    fn hp_ratio_remaining(&self) -> f64 {
        self.ledger.hp_ratio_remaining()
    }

    fn get_last_spurt_pair(
        &mut self,
        state: &RaceState,
        max_speed: f64,
        base_target_speed2: f64,
    ) -> Result<LastSpurtPair> {
        self.ledger.require_init("get_last_spurt_pair")?;
        let max_speed = ensure_finite("max_speed", max_speed)?;
        let floor = ensure_finite("base_target_speed2", base_target_speed2)?.min(max_speed);
        let distance = self.ledger.distance();
        let final_leg = state.final_leg();

        // Sized from the start of the late race, not the current position.
        let late_span = distance - distance * 2.0 / 3.0;
        let seconds = (late_span - SPURT_FINISH_BUFFER) / max_speed;
        let hp_needed = self.ledger.hp_per_second(&final_leg, max_speed)? * seconds;
        if self.ledger.hp() >= hp_needed {
            self.max_spurt = true;
            debug!("game spurt: full speed {max_speed:.3} (need {hp_needed:.1})");
            return Ok(LastSpurtPair {
                transition: LastSpurtPair::SPURT_NOW,
                speed: max_speed,
            });
        }

        let candidates = self.candidates(state, &final_leg, max_speed, floor)?;
        let rank = pick_rank(
            &mut self.rng,
            self.ledger.subpar_accept_chance(),
            SUBPAR_ROLL_RANGE,
            candidates.len(),
        );
        let chosen = candidates[rank];
        self.max_spurt = false;
        debug!(
            "game spurt: rank {rank}/{} transition={:.1} speed={:.3}",
            candidates.len(),
            chosen.transition,
            chosen.speed
        );
        Ok(chosen.pair())
    }

    fn is_max_spurt(&self) -> bool {
        self.max_spurt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::Phase;
    use crate::error::PolicyError;
    use crate::rng::SequencePrng;

    #[test]
    fn spurt_before_init_fails_fast() {
        let mut policy = GameStaminaPolicy::new(
            &CourseData::default(),
            GroundCondition::Firm,
            SequencePrng::new(vec![0.0]),
        );
        let state = RaceState::at(1400.0, Phase::LateRace);
        assert_eq!(
            policy.get_last_spurt_pair(&state, 24.0, 21.0),
            Err(PolicyError::NotInitialized {
                operation: "get_last_spurt_pair"
            })
        );
        assert!(policy.tick(&state, 0.1).is_err());
    }

    #[test]
    fn safe_speed_exhausts_the_budget() {
        let mut policy = GameStaminaPolicy::new(
            &CourseData::default(),
            GroundCondition::Firm,
            SequencePrng::new(vec![0.0]),
        );
        policy.init(&HorseParameters::default()).unwrap();
        policy.set_hp(900.0);
        let leg = RaceState::at(1400.0, Phase::LateRace);
        let remaining = 540.0;
        let speed = policy.safe_speed(&leg, remaining, 100.0, 0.0).unwrap();
        let spent = policy.ledger().hp_per_second(&leg, speed).unwrap() * remaining / speed;
        assert!((spent - 900.0).abs() < 1e-6);
    }

    #[test]
    fn accepted_roll_takes_the_fastest_plan() {
        let horse = HorseParameters::default();
        let base = CourseData::default().base_speed();
        let max_speed = crate::speed::last_spurt_speed(&horse, base);
        let floor = crate::speed::base_target_speed(&horse, base, Phase::LateRace);
        let mut policy = GameStaminaPolicy::new(
            &CourseData::default(),
            GroundCondition::Firm,
            SequencePrng::new(vec![0.0]),
        );
        policy.init(&horse).unwrap();
        policy.set_hp(1100.0);
        let state = RaceState::at(1333.0, Phase::LateRace);

        let candidates = policy
            .candidates(&state, &state.final_leg(), max_speed, floor)
            .unwrap();
        assert!(candidates.len() > 1);
        assert!(candidates.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(candidates.iter().any(|c| (c.transition - state.pos).abs() < 1e-9));

        let pair = policy.get_last_spurt_pair(&state, max_speed, floor).unwrap();
        let fastest = candidates[0];
        assert!((pair.speed - fastest.speed).abs() < f64::EPSILON);
        assert!((pair.transition - fastest.transition).abs() < f64::EPSILON);
        let min_time = candidates.iter().map(|c| c.time).fold(f64::INFINITY, f64::min);
        assert!((fastest.time - min_time).abs() < f64::EPSILON);
    }
}
