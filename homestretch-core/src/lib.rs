//! Homestretch Core
//!
//! Per-runner stamina ledger and last-spurt pacing policies for a deterministic
//! horse-race simulator, plus a closed-form stamina analysis and a parallel
//! Monte-Carlo batch sampler. No I/O, no global state: randomness is injected
//! and every sample is reproducible from its seed.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod course;
pub mod error;
pub mod health;
pub mod horse;
pub mod numbers;
pub mod race_state;
pub mod rng;
pub mod sampler;
pub mod speed;

// Re-export commonly used types
pub use analysis::{
    PhaseBreakdown, StaminaAnalysis, TheoreticalMaxSpurt, stamina_analysis, theoretical_max_spurt,
};
pub use config::{ConfigError, RecoveryEvent, SimulationConfig};
pub use course::{CourseData, GroundCondition, Phase, Slope, Surface};
pub use error::{PolicyError, Result};
pub use health::{
    EnhancedStaminaPolicy, GameStaminaPolicy, HpLedger, LastSpurtPair, NoopStaminaPolicy,
    PolicyKind, SpurtParameters, StaminaPolicy, build_policy, status_modifier,
};
pub use horse::{Aptitude, HorseParameters, Strategy};
pub use race_state::{PositionKeepState, RaceState};
pub use rng::{
    ChaChaPrng, CountingPrng, DrawCounter, DrawCounts, Prng, Rule30Rng, SequencePrng,
    derive_sample_seed,
};
pub use sampler::{BatchSummary, SampleOutcome, run_batch, run_outcomes, run_sample};
pub use speed::{base_target_speed, last_spurt_speed, minimum_speed};
