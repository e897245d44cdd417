//! Stamina policies: the HP ledger and the last-spurt solvers.
//!
//! The race driver selects a variant at construction time through
//! [`build_policy`] and talks to it through [`StaminaPolicy`]. Both concrete
//! variants share the [`HpLedger`] for max-HP setup, consumption and
//! recovery, and differ only in how they plan the finishing stretch.
use serde::{Deserialize, Serialize};

use crate::course::{CourseData, GroundCondition};
use crate::error::Result;
use crate::horse::HorseParameters;
use crate::race_state::RaceState;
use crate::rng::Prng;

mod enhanced;
mod game;
mod ledger;

pub use enhanced::EnhancedStaminaPolicy;
pub use game::GameStaminaPolicy;
pub use ledger::{HpLedger, status_modifier};

/// Where the last spurt starts and how fast it runs.
///
/// `transition == -1.0` means "spurt immediately at `speed`".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastSpurtPair {
    pub transition: f64,
    pub speed: f64,
}

impl LastSpurtPair {
    pub const SPURT_NOW: f64 = -1.0;

    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.transition < 0.0
    }
}

/// A solved spurt plan, as cached by the enhanced policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpurtParameters {
    pub transition: f64,
    pub speed: f64,
    /// Metres run at `speed`.
    pub distance: f64,
    /// Estimated seconds from the decision point to the finish.
    pub time: f64,
}

impl SpurtParameters {
    #[must_use]
    pub const fn pair(&self) -> LastSpurtPair {
        LastSpurtPair {
            transition: self.transition,
            speed: self.speed,
        }
    }
}

/// Per-runner stamina model consumed by the race driver.
///
/// Calls for one runner must arrive in race-time order. Every stateful call
/// made before [`StaminaPolicy::init`] fails with
/// [`crate::PolicyError::NotInitialized`].
pub trait StaminaPolicy {
    /// Reset all mutable state for a new run of `horse`.
    fn init(&mut self, horse: &HorseParameters) -> Result<()>;

    /// Consume stamina for `dt` seconds at `state.current_speed`.
    fn tick(&mut self, state: &RaceState, dt: f64) -> Result<()>;

    /// Restore `pct` of max HP.
    fn recover(&mut self, pct: f64, state: &RaceState) -> Result<()>;

    fn hp(&self) -> f64;

    fn max_hp(&self) -> f64;

    fn has_remaining_hp(&self) -> bool;

    fn hp_ratio_remaining(&self) -> f64;

    /// Plan the finishing stretch. The returned speed lies in
    /// `[base_target_speed2, max_speed]`.
    fn get_last_spurt_pair(
        &mut self,
        state: &RaceState,
        max_speed: f64,
        base_target_speed2: f64,
    ) -> Result<LastSpurtPair>;

    fn is_max_spurt(&self) -> bool;

    /// Spurt re-plans triggered by late-race recovery.
    fn recalculation_count(&self) -> u32 {
        0
    }
}

/// Which stamina model a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Game,
    Enhanced,
}

impl PolicyKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Enhanced => "enhanced",
        }
    }
}

/// Construct the selected policy. `accuracy_mode` only affects [`PolicyKind::Enhanced`].
#[must_use]
pub fn build_policy<R: Prng + 'static>(
    kind: PolicyKind,
    course: &CourseData,
    ground: GroundCondition,
    rng: R,
    accuracy_mode: bool,
) -> Box<dyn StaminaPolicy> {
    match kind {
        PolicyKind::Game => Box::new(GameStaminaPolicy::new(course, ground, rng)),
        PolicyKind::Enhanced => Box::new(EnhancedStaminaPolicy::new(
            course,
            ground,
            rng,
            accuracy_mode,
        )),
    }
}

/// Stand-in used when stamina is not simulated: never tires, always requests
/// the full spurt, never draws. It makes no stamina decision, so it never
/// reports a max spurt.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoopStaminaPolicy;

impl StaminaPolicy for NoopStaminaPolicy {
    fn init(&mut self, _horse: &HorseParameters) -> Result<()> {
        Ok(())
    }

    fn tick(&mut self, _state: &RaceState, _dt: f64) -> Result<()> {
        Ok(())
    }

    fn recover(&mut self, _pct: f64, _state: &RaceState) -> Result<()> {
        Ok(())
    }

    fn hp(&self) -> f64 {
        1.0
    }

    fn max_hp(&self) -> f64 {
        1.0
    }

    fn has_remaining_hp(&self) -> bool {
        true
    }

    fn hp_ratio_remaining(&self) -> f64 {
        1.0
    }

    fn get_last_spurt_pair(
        &mut self,
        _state: &RaceState,
        max_speed: f64,
        _base_target_speed2: f64,
    ) -> Result<LastSpurtPair> {
        Ok(LastSpurtPair {
            transition: LastSpurtPair::SPURT_NOW,
            speed: max_speed,
        })
    }

    fn is_max_spurt(&self) -> bool {
        false
    }
}
