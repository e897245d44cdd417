use log::{debug, trace};
use smallvec::SmallVec;

use crate::constants::{
    HP_PER_SECOND_SCALE, HP_VELOCITY_DIVISOR, HP_VELOCITY_OFFSET, LEAD_COMPETITION,
    LEAD_COMPETITION_RUNAWAY, LEAD_COMPETITION_RUNAWAY_RUSHED, LEAD_COMPETITION_RUSHED,
    STATUS_DOWNHILL, STATUS_PACE_DOWN, STATUS_RUSHED, hp_ground_modifier,
    hp_strategy_coefficient,
};
use crate::course::{CourseData, GroundCondition};
use crate::error::{PolicyError, Result, ensure_finite};
use crate::horse::{HorseParameters, Strategy};
use crate::numbers::round_f64_to_u32;
use crate::race_state::{PositionKeepState, RaceState};
use crate::rng::Prng;

use super::SpurtParameters;

/// Candidate lists rarely exceed a few dozen entries.
pub(crate) type Candidates = SmallVec<[SpurtParameters; 64]>;

/// Values fixed by `init` for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RunStats {
    max_hp: f64,
    guts_modifier: f64,
    subpar_accept_chance: u32,
}

/// Stamina ledger shared by every policy variant.
///
/// Course-derived values are fixed at construction; stat-derived values at
/// [`HpLedger::init`]. `hp` may go negative and is only clamped from above.
#[derive(Debug, Clone, PartialEq)]
pub struct HpLedger {
    distance: f64,
    base_speed: f64,
    ground_modifier: f64,
    hp: f64,
    stats: Option<RunStats>,
}

impl HpLedger {
    #[must_use]
    pub fn new(course: &CourseData, ground: GroundCondition) -> Self {
        Self {
            distance: course.distance,
            base_speed: course.base_speed(),
            ground_modifier: hp_ground_modifier(course.surface, ground),
            hp: 0.0,
            stats: None,
        }
    }

    /// Set up max HP and the stat-derived modifiers, refilling HP.
    pub fn init(&mut self, horse: &HorseParameters) -> Result<()> {
        let max_hp = ensure_finite(
            "max_hp",
            0.8 * hp_strategy_coefficient(horse.strategy) * horse.stamina + self.distance,
        )?;
        let guts_modifier = ensure_finite(
            "guts_modifier",
            1.0 + 200.0 / (600.0 * horse.guts).sqrt(),
        )?;
        let accept = ensure_finite("subpar_accept_chance", (15.0 + 0.05 * horse.wisdom) * 1000.0)?;
        let stats = RunStats {
            max_hp,
            guts_modifier,
            subpar_accept_chance: round_f64_to_u32(accept),
        };
        debug!(
            "stamina init: max_hp={max_hp:.2} guts_modifier={guts_modifier:.4} accept={} ground={}",
            stats.subpar_accept_chance, self.ground_modifier
        );
        self.hp = max_hp;
        self.stats = Some(stats);
        Ok(())
    }

    fn stats(&self, operation: &'static str) -> Result<RunStats> {
        self.stats
            .ok_or(PolicyError::NotInitialized { operation })
    }

    /// Fail with `NotInitialized` unless `init` has run.
    pub fn require_init(&self, operation: &'static str) -> Result<()> {
        self.stats(operation).map(|_| ())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.stats.is_some()
    }

    /// HP consumed per second, per squared m/s of effective speed.
    pub fn consumption_factor(&self, state: &RaceState) -> Result<f64> {
        let stats = self.stats("hp_per_second")?;
        let guts = if state.phase.is_late() {
            stats.guts_modifier
        } else {
            1.0
        };
        Ok(HP_PER_SECOND_SCALE / HP_VELOCITY_DIVISOR
            * status_modifier(state)
            * self.ground_modifier
            * guts)
    }

    /// Stamina drain at `velocity` under `state`'s modifiers.
    pub fn hp_per_second(&self, state: &RaceState, velocity: f64) -> Result<f64> {
        let excess = velocity - self.base_speed + HP_VELOCITY_OFFSET;
        ensure_finite("hp_per_second", self.consumption_factor(state)? * excess * excess)
    }

    /// Drain `dt` seconds at the state's current speed.
    pub fn consume(&mut self, state: &RaceState, dt: f64) -> Result<f64> {
        let drain = self.hp_per_second(state, state.current_speed)? * dt;
        self.hp = ensure_finite("hp", self.hp - drain)?;
        trace!("tick pos={:.2} drain={drain:.4} hp={:.3}", state.pos, self.hp);
        Ok(drain)
    }

    /// `hp = min(hp + max_hp * pct, max_hp)`; negative HP is not floored first.
    pub fn recover(&mut self, pct: f64) -> Result<()> {
        let stats = self.stats("recover")?;
        let pct = ensure_finite("recovery_pct", pct)?;
        self.hp = (self.hp + stats.max_hp * pct).min(stats.max_hp);
        Ok(())
    }

    #[must_use]
    pub const fn hp(&self) -> f64 {
        self.hp
    }

    /// Overwrite current HP. Used by drivers that script stamina directly.
    pub fn set_hp(&mut self, hp: f64) {
        self.hp = hp;
    }

    #[must_use]
    pub fn max_hp(&self) -> f64 {
        self.stats.map_or(0.0, |s| s.max_hp)
    }

    #[must_use]
    pub fn has_remaining_hp(&self) -> bool {
        self.hp > 0.0
    }

    #[must_use]
    pub fn hp_ratio_remaining(&self) -> f64 {
        let max_hp = self.max_hp();
        if max_hp <= 0.0 {
            return 0.0;
        }
        (self.hp / max_hp).max(0.0)
    }

    #[must_use]
    pub fn guts_modifier(&self) -> f64 {
        self.stats.map_or(1.0, |s| s.guts_modifier)
    }

    #[must_use]
    pub fn subpar_accept_chance(&self) -> u32 {
        self.stats.map_or(0, |s| s.subpar_accept_chance)
    }

    #[must_use]
    pub const fn base_speed(&self) -> f64 {
        self.base_speed
    }

    #[must_use]
    pub const fn distance(&self) -> f64 {
        self.distance
    }

    #[must_use]
    pub const fn ground_modifier(&self) -> f64 {
        self.ground_modifier
    }
}

/// Multiplicative consumption adjustment for transient states.
///
/// Lead competition replaces the ordinary rushed factor; downhill and
/// pace-down still stack on top of it.
#[must_use]
pub fn status_modifier(state: &RaceState) -> f64 {
    let mut modifier = 1.0;
    if state.is_downhill_mode {
        modifier *= STATUS_DOWNHILL;
    }
    if state.lead_competition {
        let runaway = state.pos_keep_strategy == Strategy::Runaway;
        modifier *= match (runaway, state.is_rushed) {
            (true, true) => LEAD_COMPETITION_RUNAWAY_RUSHED,
            (true, false) => LEAD_COMPETITION_RUNAWAY,
            (false, true) => LEAD_COMPETITION_RUSHED,
            (false, false) => LEAD_COMPETITION,
        };
    } else if state.is_rushed {
        modifier *= STATUS_RUSHED;
    }
    if state.position_keep_state == PositionKeepState::PaceDown {
        modifier *= STATUS_PACE_DOWN;
    }
    modifier
}

/// Stable ascending sort on estimated finish time.
pub(crate) fn sort_by_time(candidates: &mut Candidates) {
    candidates.sort_by(|a, b| a.time.total_cmp(&b.time));
}

/// Pick a candidate index with a single `uniform(range)` draw.
///
/// A roll at or under `accept_chance` takes the fastest candidate. Otherwise the
/// roll is mapped through the geometric inverse CDF to the rank a run of
/// independent accept/reject rolls would stop at, capped at the last entry.
pub(crate) fn pick_rank<R: Prng>(
    rng: &mut R,
    accept_chance: u32,
    range: u32,
    len: usize,
) -> usize {
    let last = len.saturating_sub(1);
    let roll = rng.uniform(range);
    if roll <= accept_chance {
        return 0;
    }
    let p = f64::from(accept_chance) / f64::from(range);
    if p <= 0.0 {
        return last;
    }
    let u = f64::from(roll) / f64::from(range);
    let rank = ((1.0 - u).ln() / (1.0 - p).ln()).floor();
    crate::numbers::floor_f64_to_index(rank).min(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Phase, Surface};
    use crate::rng::SequencePrng;

    fn ledger() -> HpLedger {
        let mut ledger = HpLedger::new(&CourseData::default(), GroundCondition::Firm);
        ledger.init(&HorseParameters::default()).unwrap();
        ledger
    }

    #[test]
    fn init_derives_modifiers() {
        let ledger = ledger();
        assert!((ledger.max_hp() - (0.8 * 0.89 * 1000.0 + 2000.0)).abs() < 1e-9);
        assert!((ledger.hp() - ledger.max_hp()).abs() < f64::EPSILON);
        let guts = 1.0 + 200.0 / (600.0_f64 * 900.0).sqrt();
        assert!((ledger.guts_modifier() - guts).abs() < 1e-12);
        assert_eq!(ledger.subpar_accept_chance(), 65_000);
    }

    #[test]
    fn uninitialized_ledger_refuses_work() {
        let mut ledger = HpLedger::new(&CourseData::default(), GroundCondition::Firm);
        let state = RaceState::default();
        assert_eq!(
            ledger.consume(&state, 1.0),
            Err(PolicyError::NotInitialized {
                operation: "hp_per_second"
            })
        );
        assert!(ledger.recover(0.1).is_err());
    }

    #[test]
    fn consumption_at_base_speed_is_twenty_per_second() {
        let ledger = ledger();
        let hps = ledger
            .hp_per_second(&RaceState::at(100.0, Phase::EarlyRace), 20.0)
            .unwrap();
        assert!((hps - 20.0).abs() < 1e-9);
    }

    #[test]
    fn late_phases_apply_guts() {
        let ledger = ledger();
        let early = ledger
            .hp_per_second(&RaceState::at(100.0, Phase::MidRace), 21.0)
            .unwrap();
        let late = ledger
            .hp_per_second(&RaceState::at(1500.0, Phase::LateRace), 21.0)
            .unwrap();
        assert!((late / early - ledger.guts_modifier()).abs() < 1e-12);
    }

    #[test]
    fn soft_going_drains_faster() {
        let mut soft = HpLedger::new(&CourseData::flat(2000.0, Surface::Turf), GroundCondition::Soft);
        soft.init(&HorseParameters::default()).unwrap();
        let state = RaceState::at(10.0, Phase::EarlyRace);
        let ratio = soft.hp_per_second(&state, 20.0).unwrap()
            / ledger().hp_per_second(&state, 20.0).unwrap();
        assert!((ratio - 1.02).abs() < 1e-12);
    }

    #[test]
    fn status_modifiers_stack() {
        let mut state = RaceState::default();
        state.is_rushed = true;
        state.position_keep_state = PositionKeepState::PaceDown;
        assert!((status_modifier(&state) - 1.6 * 0.6).abs() < 1e-12);

        let mut downhill = RaceState::default();
        downhill.is_downhill_mode = true;
        assert!((status_modifier(&downhill) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn lead_competition_replaces_rushed_factor() {
        let mut state = RaceState::default();
        state.lead_competition = true;
        assert!((status_modifier(&state) - 1.4).abs() < 1e-12);
        state.is_rushed = true;
        assert!((status_modifier(&state) - 3.6).abs() < 1e-12);
        state.pos_keep_strategy = Strategy::Runaway;
        assert!((status_modifier(&state) - 7.7).abs() < 1e-12);
        state.is_rushed = false;
        assert!((status_modifier(&state) - 3.5).abs() < 1e-12);
        state.is_downhill_mode = true;
        assert!((status_modifier(&state) - 3.5 * 0.4).abs() < 1e-12);
    }

    #[test]
    fn recover_clamps_only_the_top() {
        let mut ledger = ledger();
        let max_hp = ledger.max_hp();
        ledger.set_hp(-100.0);
        ledger.recover(0.2).unwrap();
        assert!((ledger.hp() - (-100.0 + max_hp * 0.2)).abs() < 1e-9);
        ledger.recover(5.0).unwrap();
        assert!((ledger.hp() - max_hp).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_never_negative() {
        let mut ledger = ledger();
        ledger.set_hp(-50.0);
        assert!(!ledger.has_remaining_hp());
        assert!(ledger.hp_ratio_remaining().abs() < f64::EPSILON);
    }

    #[test]
    fn nan_stats_are_surfaced() {
        let mut ledger = HpLedger::new(&CourseData::default(), GroundCondition::Firm);
        let horse = HorseParameters::default().with_stamina(f64::NAN);
        assert!(matches!(
            ledger.init(&horse),
            Err(PolicyError::NonFinite {
                quantity: "max_hp",
                ..
            })
        ));
    }

    #[test]
    fn low_roll_takes_fastest_candidate() {
        let mut rng = SequencePrng::new(vec![0.1]);
        assert_eq!(pick_rank(&mut rng, 65_000, 100_000, 10), 0);
    }

    #[test]
    fn high_roll_walks_down_the_ranks() {
        // u = 0.9, p = 0.65: ln(0.1) / ln(0.35) ~= 2.19
        let mut rng = SequencePrng::new(vec![0.9]);
        assert_eq!(pick_rank(&mut rng, 65_000, 100_000, 10), 2);
        let mut rng = SequencePrng::new(vec![0.9]);
        assert_eq!(pick_rank(&mut rng, 65_000, 100_000, 2), 1);
    }

    #[test]
    fn full_candidate_list_stays_inline() {
        // 0.1 m/s steps across a 3+ m/s spread, plus the safe plan.
        let mut candidates = Candidates::new();
        for _ in 0..40 {
            candidates.push(SpurtParameters {
                transition: 1400.0,
                speed: 22.0,
                distance: 600.0,
                time: 27.0,
            });
        }
        assert!(!candidates.spilled());
    }

    #[test]
    fn sort_is_by_time_and_stable() {
        let plan = |speed, time| SpurtParameters {
            transition: 1400.0,
            speed,
            distance: 600.0,
            time,
        };
        let mut candidates: Candidates = [plan(23.0, 28.4), plan(22.0, 28.3), plan(21.0, 28.4)]
            .into_iter()
            .collect();
        sort_by_time(&mut candidates);
        let speeds: Vec<f64> = candidates.iter().map(|c| c.speed).collect();
        assert_eq!(speeds, vec![22.0, 23.0, 21.0]);
    }

    #[test]
    fn zero_chance_falls_back_to_last() {
        let mut rng = SequencePrng::new(vec![0.5]);
        assert_eq!(pick_rank(&mut rng, 0, 100_000, 4), 3);
    }
}
