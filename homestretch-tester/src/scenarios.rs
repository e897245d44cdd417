use anyhow::{Result, bail, ensure};
use homestretch_core::{
    BatchSummary, CourseData, HorseParameters, Phase, PolicyKind, RecoveryEvent, SampleOutcome,
    SimulationConfig, Strategy, Surface, base_target_speed, last_spurt_speed, minimum_speed,
};

const FLOAT_TOLERANCE: f64 = 1e-9;

/// Everything a scenario check can look at after a batch.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub config: SimulationConfig,
    pub outcomes: Vec<SampleOutcome>,
    pub summary: BatchSummary,
    /// Second batch over the same config, for replay checks.
    pub replay: BatchSummary,
}

type Check = fn(&ScenarioRun) -> Result<()>;

/// A named preset plus the expectations its batch must meet.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub key: String,
    pub description: String,
    pub config: SimulationConfig,
    /// Policy the scenario relies on; `--policy` does not override it.
    pub pinned_policy: Option<PolicyKind>,
    check: Check,
}

impl Scenario {
    fn preset(
        key: &str,
        description: &str,
        config: SimulationConfig,
        pinned_policy: Option<PolicyKind>,
        check: Check,
    ) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
            config,
            pinned_policy,
            check,
        }
    }

    /// Scenario for a user-supplied config; only the universal checks apply.
    #[must_use]
    pub fn custom(config: SimulationConfig) -> Self {
        Self::preset(
            "custom",
            "Config loaded from --config",
            config,
            None,
            |_| Ok(()),
        )
    }

    pub fn evaluate(&self, run: &ScenarioRun) -> Vec<String> {
        let mut failures = Vec::new();
        if let Err(err) = check_universal(run) {
            failures.push(format!("{err:#}"));
        }
        if let Err(err) = (self.check)(run) {
            failures.push(format!("{err:#}"));
        }
        failures
    }
}

pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::preset(
            "front-runner-sprint",
            "1200 m front runner with stamina to spare",
            SimulationConfig {
                horse: HorseParameters::default()
                    .with_strategy(Strategy::FrontRunner)
                    .with_stamina(700.0)
                    .with_guts(800.0),
                course: CourseData::flat(1200.0, Surface::Turf),
                ..SimulationConfig::default()
            },
            None,
            expect_full_spurt,
        ),
        Scenario::preset(
            "mid-distance-pace-chaser",
            "2000 m pace chaser with default stats",
            SimulationConfig::default(),
            None,
            expect_full_spurt,
        ),
        Scenario::preset(
            "long-late-surger",
            "3000 m late surger short of a full-length spurt",
            SimulationConfig {
                horse: HorseParameters::default()
                    .with_strategy(Strategy::LateSurger)
                    .with_stamina(900.0),
                course: CourseData::flat(3000.0, Surface::Turf),
                ..SimulationConfig::default()
            },
            None,
            expect_partial_spurt,
        ),
        Scenario::preset(
            "late-heal-accuracy",
            "Enhanced policy replans after each late-race heal",
            SimulationConfig {
                policy: PolicyKind::Enhanced,
                accuracy_mode: true,
                recoveries: vec![
                    RecoveryEvent {
                        position: 800.0,
                        pct: 0.04,
                    },
                    RecoveryEvent {
                        position: 1450.0,
                        pct: 0.055,
                    },
                    RecoveryEvent {
                        position: 1700.0,
                        pct: 0.035,
                    },
                ],
                ..SimulationConfig::default()
            },
            Some(PolicyKind::Enhanced),
            expect_late_replans,
        ),
        Scenario::preset(
            "exhausted-runaway",
            "3200 m runaway that cannot hold even the cruise speed",
            SimulationConfig {
                horse: HorseParameters::default()
                    .with_strategy(Strategy::Runaway)
                    .with_stamina(200.0),
                course: CourseData::flat(3200.0, Surface::Turf),
                ..SimulationConfig::default()
            },
            None,
            expect_exhaustion,
        ),
    ]
}

#[must_use]
pub fn list_scenarios() -> Vec<(String, String)> {
    catalog()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<Scenario> {
    catalog()
        .into_iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
}

fn check_universal(run: &ScenarioRun) -> Result<()> {
    let summary = &run.summary;
    ensure!(
        summary == &run.replay,
        "replay drifted: digest {:#018x} vs {:#018x}",
        summary.digest,
        run.replay.digest
    );
    ensure!(
        summary.completed == run.config.samples,
        "completed {} of {} samples",
        summary.completed,
        run.config.samples
    );

    let base = run.config.course.base_speed();
    let fastest = last_spurt_speed(&run.config.horse, base);
    let slowest = minimum_speed(&run.config.horse, base);
    let distance = run.config.course.distance;
    ensure!(
        summary.min_finish_time >= distance / fastest - FLOAT_TOLERANCE,
        "finish {:.3}s beats the spurt-speed bound {:.3}s",
        summary.min_finish_time,
        distance / fastest
    );
    ensure!(
        summary.max_finish_time <= distance / slowest + FLOAT_TOLERANCE,
        "finish {:.3}s slower than the minimum-speed bound {:.3}s",
        summary.max_finish_time,
        distance / slowest
    );
    ensure!(
        summary.min_finish_time <= summary.mean_finish_time + FLOAT_TOLERANCE
            && summary.mean_finish_time <= summary.max_finish_time + FLOAT_TOLERANCE,
        "mean finish {:.3}s outside [{:.3}, {:.3}]",
        summary.mean_finish_time,
        summary.min_finish_time,
        summary.max_finish_time
    );
    Ok(())
}

fn expect_full_spurt(run: &ScenarioRun) -> Result<()> {
    let summary = &run.summary;
    ensure!(
        (summary.max_spurt_rate - 1.0).abs() < FLOAT_TOLERANCE,
        "expected every sample to max spurt, rate {:.3}",
        summary.max_spurt_rate
    );
    ensure!(
        summary.total_rng_draws == 0,
        "full spurts should not roll, saw {} draws",
        summary.total_rng_draws
    );
    ensure!(
        summary.hp_exhausted_rate.abs() < FLOAT_TOLERANCE,
        "HP ran out in {:.1}% of samples",
        summary.hp_exhausted_rate * 100.0
    );
    Ok(())
}

fn expect_partial_spurt(run: &ScenarioRun) -> Result<()> {
    let summary = &run.summary;
    ensure!(
        summary.max_spurt_rate.abs() < FLOAT_TOLERANCE,
        "expected no full spurts, rate {:.3}",
        summary.max_spurt_rate
    );
    ensure!(
        summary.total_rng_draws == u64::try_from(summary.completed).unwrap_or(u64::MAX),
        "expected one roll per sample, saw {} over {}",
        summary.total_rng_draws,
        summary.completed
    );

    let base = run.config.course.base_speed();
    let cruise = base_target_speed(&run.config.horse, base, Phase::LateRace);
    let ceiling = last_spurt_speed(&run.config.horse, base);
    for outcome in &run.outcomes {
        let Some(pair) = outcome.spurt else {
            bail!("sample {} never planned a spurt", outcome.index);
        };
        ensure!(
            pair.speed >= cruise - FLOAT_TOLERANCE && pair.speed < ceiling,
            "sample {} picked {:.3} m/s outside [{cruise:.3}, {ceiling:.3})",
            outcome.index,
            pair.speed
        );
    }
    Ok(())
}

fn expect_late_replans(run: &ScenarioRun) -> Result<()> {
    let summary = &run.summary;
    ensure!(
        (summary.mean_recalculations - 2.0).abs() < FLOAT_TOLERANCE,
        "expected two late-race replans, mean {:.3}",
        summary.mean_recalculations
    );
    ensure!(
        (summary.max_spurt_rate - 1.0).abs() < FLOAT_TOLERANCE,
        "max spurt should stick once reached, rate {:.3}",
        summary.max_spurt_rate
    );
    Ok(())
}

fn expect_exhaustion(run: &ScenarioRun) -> Result<()> {
    let summary = &run.summary;
    ensure!(
        (summary.hp_exhausted_rate - 1.0).abs() < FLOAT_TOLERANCE,
        "expected every sample to run dry, rate {:.3}",
        summary.hp_exhausted_rate
    );
    ensure!(
        summary.max_spurt_rate.abs() < FLOAT_TOLERANCE,
        "an exhausted runner cannot max spurt, rate {:.3}",
        summary.max_spurt_rate
    );
    ensure!(
        summary.mean_final_hp < 0.0,
        "final HP should go negative, mean {:.1}",
        summary.mean_final_hp
    );
    Ok(())
}
