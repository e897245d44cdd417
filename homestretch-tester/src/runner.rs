use colored::Colorize;
use homestretch_core::{
    BatchSummary, PolicyKind, SimulationConfig, run_batch, run_outcomes, stamina_analysis,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::scenarios::{Scenario, ScenarioRun};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub policy: PolicyKind,
    pub passed: bool,
    pub samples: usize,
    pub failures: Vec<String>,
    /// Missing when the batch itself errored.
    pub summary: Option<BatchSummary>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// CLI-level overrides applied on top of each scenario's preset config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSettings {
    pub samples: Option<usize>,
    pub policy: Option<PolicyKind>,
    pub accuracy_mode: bool,
}

pub struct ScenarioRunner {
    settings: RunSettings,
    verbose: bool,
}

impl ScenarioRunner {
    pub const fn new(settings: RunSettings, verbose: bool) -> Self {
        Self { settings, verbose }
    }

    pub fn run_scenario(&self, scenario: &Scenario, seeds: &[u64]) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                let config = self.config_for(scenario, seed);
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (policy: {} seed: {} samples: {})",
                        scenario.key.bright_white(),
                        config.policy.label(),
                        seed,
                        config.samples
                    );
                    print_budget(&config);
                }
                run_single(scenario, config)
            })
            .collect()
    }

    fn config_for(&self, scenario: &Scenario, seed: u64) -> SimulationConfig {
        let mut config = scenario.config.clone();
        config.seed = seed;
        if let Some(samples) = self.settings.samples {
            config.samples = samples;
        }
        if let Some(policy) = scenario.pinned_policy.or(self.settings.policy) {
            config.policy = policy;
        }
        config.accuracy_mode |= self.settings.accuracy_mode;
        config
    }
}

/// Closed-form stamina budget, for comparing against the sampled outcome.
fn print_budget(config: &SimulationConfig) {
    match stamina_analysis(&config.horse, &config.course, config.ground) {
        Ok(analysis) => println!(
            "   📐 Budget: max HP {:.0}, full spurt needs {:.0} ({})",
            analysis.max_hp,
            analysis.total_hp_needed,
            if analysis.can_max_spurt {
                "affordable".green()
            } else {
                "short".yellow()
            }
        ),
        Err(err) => warn!("stamina analysis failed: {err}"),
    }
}

fn run_single(scenario: &Scenario, config: SimulationConfig) -> ScenarioResult {
    let start = Instant::now();
    let seed = config.seed;
    let policy = config.policy;
    let samples = config.samples;

    let (failures, summary) = match execute(config) {
        Ok(run) => {
            let failures = scenario.evaluate(&run);
            (failures, Some(run.summary))
        }
        Err(err) => (vec![format!("{err:#}")], None),
    };
    let duration = start.elapsed();
    debug!(
        "{} seed {seed}: {} failure(s) in {duration:?}",
        scenario.key,
        failures.len()
    );

    ScenarioResult {
        scenario_name: scenario.key.clone(),
        seed,
        policy,
        passed: failures.is_empty(),
        samples,
        failures,
        summary,
        duration,
    }
}

fn execute(config: SimulationConfig) -> anyhow::Result<ScenarioRun> {
    config.validate()?;
    let outcomes = run_outcomes(&config, None)?;
    let summary = BatchSummary::from_outcomes(&outcomes);
    let replay = run_batch(&config, None)?;
    Ok(ScenarioRun {
        config,
        outcomes,
        summary,
        replay,
    })
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
