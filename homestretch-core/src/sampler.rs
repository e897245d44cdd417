//! Reference stint driver and Monte-Carlo batch runner.
//!
//! The driver holds a constant speed within each frame: the strategy's target
//! speed until the late race, then the planned cruise/spurt pair, and the
//! minimum speed once HP runs out. There is no acceleration, lane or skill
//! model. Each sample owns its generator, policy and state, so samples run in
//! parallel and aggregate identically regardless of scheduling.
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::atomic::{AtomicBool, Ordering};
use twox_hash::XxHash64;

use crate::config::SimulationConfig;
use crate::constants::MAX_FRAMES_PER_SAMPLE;
use crate::course::Phase;
use crate::error::{PolicyError, Result, ensure_finite};
use crate::health::{LastSpurtPair, NoopStaminaPolicy, StaminaPolicy, build_policy};
use crate::numbers::usize_to_f64;
use crate::race_state::RaceState;
use crate::rng::{CountingPrng, Rule30Rng, derive_sample_seed};
use crate::speed::{base_target_speed, last_spurt_speed, minimum_speed};

/// Result of one simulated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutcome {
    pub index: usize,
    pub seed: u64,
    pub finish_time: f64,
    pub final_hp: f64,
    pub max_spurt: bool,
    /// The last plan the driver acted on, if the runner reached the late race.
    pub spurt: Option<LastSpurtPair>,
    pub recalculations: u32,
    pub rng_draws: u64,
    pub hp_exhausted: bool,
    /// XxHash64 over the per-frame HP trajectory.
    pub digest: u64,
}

/// Aggregate over a batch, folded in sample-index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub mean_finish_time: f64,
    pub min_finish_time: f64,
    pub max_finish_time: f64,
    pub max_spurt_rate: f64,
    pub hp_exhausted_rate: f64,
    pub mean_recalculations: f64,
    pub mean_final_hp: f64,
    pub total_rng_draws: u64,
    pub digest: u64,
}

impl BatchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[SampleOutcome]) -> Self {
        let completed = outcomes.len();
        let count = usize_to_f64(completed.max(1));
        let mut hasher = XxHash64::with_seed(0);
        let mut min_finish_time = f64::INFINITY;
        let mut max_finish_time = f64::NEG_INFINITY;
        let mut finish_sum = 0.0;
        let mut hp_sum = 0.0;
        let mut recalc_sum = 0.0;
        let mut max_spurts = 0_usize;
        let mut exhausted = 0_usize;
        let mut total_rng_draws = 0_u64;
        for outcome in outcomes {
            hasher.write_u64(outcome.digest);
            min_finish_time = min_finish_time.min(outcome.finish_time);
            max_finish_time = max_finish_time.max(outcome.finish_time);
            finish_sum += outcome.finish_time;
            hp_sum += outcome.final_hp;
            recalc_sum += f64::from(outcome.recalculations);
            max_spurts += usize::from(outcome.max_spurt);
            exhausted += usize::from(outcome.hp_exhausted);
            total_rng_draws = total_rng_draws.saturating_add(outcome.rng_draws);
        }
        if completed == 0 {
            min_finish_time = 0.0;
            max_finish_time = 0.0;
        }
        Self {
            completed,
            mean_finish_time: finish_sum / count,
            min_finish_time,
            max_finish_time,
            max_spurt_rate: usize_to_f64(max_spurts) / count,
            hp_exhausted_rate: usize_to_f64(exhausted) / count,
            mean_recalculations: recalc_sum / count,
            mean_final_hp: hp_sum / count,
            total_rng_draws,
            digest: hasher.finish(),
        }
    }
}

/// Run sample `index` of the batch described by `config`.
pub fn run_sample(config: &SimulationConfig, index: usize) -> Result<SampleOutcome> {
    let seed = derive_sample_seed(config.seed, u64::try_from(index).unwrap_or(u64::MAX));
    let rng = CountingPrng::new(Rule30Rng::new(seed));
    let counter = rng.counter();
    let mut policy: Box<dyn StaminaPolicy> = if config.simulate_stamina {
        build_policy(
            config.policy,
            &config.course,
            config.ground,
            rng,
            config.accuracy_mode,
        )
    } else {
        Box::new(NoopStaminaPolicy)
    };
    policy.init(&config.horse)?;

    let horse = &config.horse;
    let course = &config.course;
    let base = course.base_speed();
    let cruise = base_target_speed(horse, base, Phase::LateRace);
    let max_speed = last_spurt_speed(horse, base);
    let floor_speed = minimum_speed(horse, base);
    let dt = config.frame_seconds;

    let mut state = RaceState::at(0.0, Phase::EarlyRace).with_strategy(horse.strategy);
    let mut recoveries = config.recoveries.iter().peekable();
    let mut hasher = XxHash64::with_seed(seed);
    let mut plan: Option<LastSpurtPair> = None;
    let mut planned_at_recalc = 0;
    let mut elapsed = 0.0;
    let mut hp_exhausted = false;

    for _ in 0..MAX_FRAMES_PER_SAMPLE {
        if state.pos >= course.distance {
            break;
        }
        state.phase = course.phase_at(state.pos);
        state.is_downhill_mode = course.is_downhill(state.pos);
        if state.phase.is_late()
            && (plan.is_none() || policy.recalculation_count() != planned_at_recalc)
        {
            plan = Some(policy.get_last_spurt_pair(&state, max_speed, cruise)?);
            planned_at_recalc = policy.recalculation_count();
        }

        let target = match plan {
            Some(pair) if pair.is_immediate() || state.pos >= pair.transition => pair.speed,
            Some(_) => cruise,
            None => base_target_speed(horse, base, state.phase),
        };
        let speed = if policy.has_remaining_hp() {
            target
        } else {
            hp_exhausted = true;
            floor_speed
        };
        state.current_speed = speed;
        policy.tick(&state, dt)?;

        let step = speed * dt;
        if state.pos + step >= course.distance {
            elapsed += (course.distance - state.pos) / speed;
            state.pos = course.distance;
        } else {
            state.pos += step;
            elapsed += dt;
        }
        state.phase = course.phase_at(state.pos);
        while let Some(event) = recoveries.next_if(|event| state.pos >= event.position) {
            policy.recover(event.pct, &state)?;
        }
        hasher.write_u64(policy.hp().to_bits());
    }

    let finish_time = ensure_finite("finish_time", elapsed)?;
    let outcome = SampleOutcome {
        index,
        seed,
        finish_time,
        final_hp: ensure_finite("hp", policy.hp())?,
        max_spurt: policy.is_max_spurt(),
        spurt: plan,
        recalculations: policy.recalculation_count(),
        rng_draws: counter.counts().total(),
        hp_exhausted,
        digest: hasher.finish(),
    };
    debug!(
        "sample {index}: finish={:.3}s hp={:.1} max_spurt={} recalcs={}",
        outcome.finish_time, outcome.final_hp, outcome.max_spurt, outcome.recalculations
    );
    Ok(outcome)
}

/// Run every sample of the batch in parallel.
///
/// `cancel` is polled before each sample starts; a raised flag stops the batch
/// with [`PolicyError::Cancelled`]. Samples already running finish normally.
pub fn run_batch(config: &SimulationConfig, cancel: Option<&AtomicBool>) -> Result<BatchSummary> {
    let outcomes = run_outcomes(config, cancel)?;
    Ok(BatchSummary::from_outcomes(&outcomes))
}

/// Like [`run_batch`], returning each sample's outcome in index order.
pub fn run_outcomes(
    config: &SimulationConfig,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<SampleOutcome>> {
    let results: Vec<Option<Result<SampleOutcome>>> = (0..config.samples)
        .into_par_iter()
        .map(|index| {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                None
            } else {
                Some(run_sample(config, index))
            }
        })
        .collect();

    let completed = results
        .iter()
        .filter(|result| matches!(result, Some(Ok(_))))
        .count();
    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Some(outcome) => outcomes.push(outcome?),
            None => return Err(PolicyError::Cancelled { completed }),
        }
    }
    Ok(outcomes)
}
