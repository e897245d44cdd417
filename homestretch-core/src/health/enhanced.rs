use log::debug;

use crate::constants::{
    HP_PER_SECOND_SCALE, HP_VELOCITY_DIVISOR, HP_VELOCITY_OFFSET, SPURT_FINISH_BUFFER,
    SPURT_SPEED_STEP, SUBPAR_ROLL_RANGE,
};
use crate::course::{CourseData, GroundCondition, Phase};
use crate::error::{Result, ensure_finite};
use crate::horse::HorseParameters;
use crate::numbers::{floor_f64_to_index, usize_to_f64};
use crate::race_state::RaceState;
use crate::rng::Prng;
use crate::speed::{base_target_speed, last_spurt_speed};

use super::ledger::{Candidates, HpLedger, pick_rank, sort_by_time, status_modifier};
use super::{LastSpurtPair, SpurtParameters, StaminaPolicy};

/// Stamina model that memoizes its spurt plan and, in accuracy mode, re-plans
/// after every late-race recovery.
#[derive(Debug, Clone)]
pub struct EnhancedStaminaPolicy<R> {
    ledger: HpLedger,
    rng: R,
    accuracy_mode: bool,
    base_target_speed2: f64,
    max_spurt_speed: f64,
    last_status_modifier: f64,
    spurt_parameters: Option<SpurtParameters>,
    max_spurt_achieved: bool,
    has_calculated_spurt_once: bool,
    recalculation_count: u32,
}

impl<R: Prng> EnhancedStaminaPolicy<R> {
    #[must_use]
    pub fn new(course: &CourseData, ground: GroundCondition, rng: R, accuracy_mode: bool) -> Self {
        Self {
            ledger: HpLedger::new(course, ground),
            rng,
            accuracy_mode,
            base_target_speed2: 0.0,
            max_spurt_speed: 0.0,
            last_status_modifier: 1.0,
            spurt_parameters: None,
            max_spurt_achieved: false,
            has_calculated_spurt_once: false,
            recalculation_count: 0,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &HpLedger {
        &self.ledger
    }

    pub fn set_hp(&mut self, hp: f64) {
        self.ledger.set_hp(hp);
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }

    #[must_use]
    pub const fn accuracy_mode(&self) -> bool {
        self.accuracy_mode
    }

    /// Late-race target speed, fixed at `init`.
    #[must_use]
    pub const fn base_target_speed2(&self) -> f64 {
        self.base_target_speed2
    }

    /// Full last-spurt speed, fixed at `init`.
    #[must_use]
    pub const fn max_spurt_speed(&self) -> f64 {
        self.max_spurt_speed
    }

    /// The cached plan, if one is live.
    #[must_use]
    pub const fn spurt_parameters(&self) -> Option<&SpurtParameters> {
        self.spurt_parameters.as_ref()
    }

    #[must_use]
    pub const fn has_calculated_spurt_once(&self) -> bool {
        self.has_calculated_spurt_once
    }

    /// HP needed to run `length` metres at a constant `velocity`.
    ///
    /// Guts applies only for spurt-phase running. The status modifier is the
    /// latest tick's, minus position keep and lead competition, which do not
    /// carry into the finishing stretch.
    pub fn calc_required_hp(
        &self,
        velocity: f64,
        length: f64,
        is_spurt_phase: bool,
        apply_status_modifier: bool,
    ) -> Result<f64> {
        self.ledger.require_init("calc_required_hp")?;
        let excess = velocity - self.ledger.base_speed() + HP_VELOCITY_OFFSET;
        let mut per_second = HP_PER_SECOND_SCALE * excess * excess / HP_VELOCITY_DIVISOR
            * self.ledger.ground_modifier();
        if is_spurt_phase {
            per_second *= self.ledger.guts_modifier();
        }
        if apply_status_modifier {
            per_second *= self.last_status_modifier;
        }
        ensure_finite("required_hp", per_second * length / velocity)
    }

    /// Metres the runner can hold `target_speed` for, cruising at the late-race
    /// target speed before that. The result is not clamped and may fall
    /// outside `[0, remaining distance]`.
    pub fn calc_spurt_distance(&self, state: &RaceState, target_speed: f64) -> Result<f64> {
        self.spurt_distance_against(state.pos, target_speed, self.base_target_speed2)
    }

    fn spurt_distance_against(&self, pos: f64, speed: f64, floor: f64) -> Result<f64> {
        let remaining = self.ledger.distance() - pos;
        let floor_cost = self.calc_required_hp(floor, 1.0, true, true)?;
        let spurt_cost = self.calc_required_hp(speed, 1.0, true, true)?;
        let budget = self.ledger.hp() - (remaining - SPURT_FINISH_BUFFER) * floor_cost;
        ensure_finite(
            "spurt_distance",
            budget / (spurt_cost - floor_cost) + SPURT_FINISH_BUFFER,
        )
    }

    /// Solve (or reuse) the spurt plan. Repeated calls return a reference to
    /// the same cached value until a recovery invalidates it.
    pub fn solve_last_spurt(
        &mut self,
        state: &RaceState,
        max_speed: f64,
        base_target_speed2: f64,
    ) -> Result<&SpurtParameters> {
        self.ledger.require_init("get_last_spurt_pair")?;
        let plan = match self.spurt_parameters.take() {
            Some(cached) => cached,
            None => {
                let solved = self.solve(state, max_speed, base_target_speed2)?;
                if !self.has_calculated_spurt_once {
                    self.has_calculated_spurt_once = true;
                    self.max_spurt_achieved = solved.speed >= max_speed;
                }
                solved
            }
        };
        Ok(self.spurt_parameters.insert(plan))
    }

    fn solve(
        &mut self,
        state: &RaceState,
        max_speed: f64,
        base_target_speed2: f64,
    ) -> Result<SpurtParameters> {
        let max_speed = ensure_finite("max_speed", max_speed)?;
        let floor = ensure_finite("base_target_speed2", base_target_speed2)?.min(max_speed);
        let distance = self.ledger.distance();
        let remaining = (distance - state.pos).max(0.0);

        let required =
            self.calc_required_hp(max_speed, remaining - SPURT_FINISH_BUFFER, true, true)?;
        if self.ledger.hp() >= required {
            debug!("enhanced spurt: full speed {max_speed:.3} at {:.1}", state.pos);
            return Ok(SpurtParameters {
                transition: LastSpurtPair::SPURT_NOW,
                speed: max_speed,
                distance: remaining,
                time: remaining / max_speed,
            });
        }

        let mut candidates = Candidates::new();
        let steps = floor_f64_to_index((max_speed - floor) / SPURT_SPEED_STEP);
        for step in 1..=steps {
            let speed = (-SPURT_SPEED_STEP).mul_add(usize_to_f64(step), max_speed);
            if speed <= floor {
                break;
            }
            let spurt = self
                .spurt_distance_against(state.pos, speed, floor)?
                .clamp(0.0, remaining);
            candidates.push(SpurtParameters {
                transition: distance - spurt,
                speed,
                distance: spurt,
                time: (remaining - spurt) / floor + spurt / speed,
            });
        }
        candidates.push(SpurtParameters {
            transition: state.pos,
            speed: floor,
            distance: remaining,
            time: remaining / floor,
        });
        sort_by_time(&mut candidates);

        let rank = pick_rank(
            &mut self.rng,
            self.ledger.subpar_accept_chance(),
            SUBPAR_ROLL_RANGE,
            candidates.len(),
        );
        let chosen = candidates[rank];
        debug!(
            "enhanced spurt: rank {rank}/{} transition={:.1} speed={:.3} recalcs={}",
            candidates.len(),
            chosen.transition,
            chosen.speed,
            self.recalculation_count
        );
        Ok(chosen)
    }
}

impl<R: Prng> StaminaPolicy for EnhancedStaminaPolicy<R> {
    fn init(&mut self, horse: &HorseParameters) -> Result<()> {
        self.ledger.init(horse)?;
        let base = self.ledger.base_speed();
        self.base_target_speed2 = ensure_finite(
            "base_target_speed2",
            base_target_speed(horse, base, Phase::LateRace),
        )?;
        self.max_spurt_speed = ensure_finite("max_spurt_speed", last_spurt_speed(horse, base))?;
        self.last_status_modifier = 1.0;
        self.spurt_parameters = None;
        self.max_spurt_achieved = false;
        self.has_calculated_spurt_once = false;
        self.recalculation_count = 0;
        Ok(())
    }

    fn tick(&mut self, state: &RaceState, dt: f64) -> Result<()> {
        self.ledger.consume(state, dt)?;
        self.last_status_modifier = status_modifier(&state.final_leg());
        Ok(())
    }

    fn recover(&mut self, pct: f64, state: &RaceState) -> Result<()> {
        self.ledger.recover(pct)?;
        if self.accuracy_mode && state.phase >= Phase::LateRace && self.spurt_parameters.is_some()
        {
            self.spurt_parameters = None;
            self.recalculation_count = self.recalculation_count.saturating_add(1);
            debug!(
                "spurt plan invalidated by recovery at {:.1} (recalc #{})",
                state.pos, self.recalculation_count
            );
        }
        Ok(())
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
        self.solve_last_spurt(state, max_speed, base_target_speed2)
            .map(SpurtParameters::pair)
    }

    fn is_max_spurt(&self) -> bool {
        self.max_spurt_achieved
    }

    fn recalculation_count(&self) -> u32 {
        self.recalculation_count
    }
}
