mod reports;
mod runner;
mod scenarios;
mod seeds;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use homestretch_core::{PolicyKind, SimulationConfig};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use runner::{RunSettings, ScenarioResult, ScenarioRunner};
use scenarios::{Scenario, get_scenario, list_scenarios};
use seeds::resolve_seed_inputs;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// The in-game stamina model
    Game,
    /// Recalculating model with accuracy mode support
    Enhanced,
}

impl From<PolicyArg> for PolicyKind {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Game => Self::Game,
            PolicyArg::Enhanced => Self::Enhanced,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "homestretch-tester", version)]
#[command(about = "Monte-Carlo batch runs and scenario checks for the homestretch stamina policies")]
struct Args {
    /// JSON simulation config to run as an extra `custom` scenario
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Samples per batch (defaults to each scenario's own count)
    #[arg(long)]
    samples: Option<usize>,

    /// Stamina policy for scenarios that do not pin one
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Re-plan the last spurt after late-race recovery (enhanced policy only)
    #[arg(long)]
    accuracy_mode: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let mut selected = expand_scenarios(&args.scenarios);
    if let Some(path) = &args.config {
        selected.push(load_custom_scenario(path)?);
    }

    let results = run_scenarios(&args, &selected, &seeds);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🏇 Homestretch Scenario Tester".bright_cyan().bold());
    println!("{}", "==============================".cyan());
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<Scenario> {
    let mut keys = split_csv(scenarios_arg);
    if keys.iter().any(|k| k.eq_ignore_ascii_case("all")) {
        keys.retain(|k| !k.eq_ignore_ascii_case("all"));
        keys.extend(list_scenarios().into_iter().map(|(key, _)| key));
    }

    let mut selected: Vec<Scenario> = Vec::new();
    for key in keys {
        if selected.iter().any(|s| s.key.eq_ignore_ascii_case(&key)) {
            continue;
        }
        match get_scenario(&key) {
            Some(scenario) => selected.push(scenario),
            None => eprintln!("⚠️  Unknown scenario: {}", key.yellow()),
        }
    }
    selected
}

fn load_custom_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = SimulationConfig::from_json(&raw)
        .with_context(|| format!("invalid simulation config {}", path.display()))?;
    Ok(Scenario::custom(config))
}

fn run_scenarios(args: &Args, scenarios: &[Scenario], seeds: &[u64]) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let runner = ScenarioRunner::new(
        RunSettings {
            samples: args.samples,
            policy: args.policy.map(PolicyKind::from),
            accuracy_mode: args.accuracy_mode,
        },
        args.verbose,
    );
    scenarios
        .iter()
        .flat_map(|scenario| runner.run_scenario(scenario, seeds))
        .collect()
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Homestretch Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => reports::generate_csv_report(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    // Machine-readable formats stay parseable.
    if matches!(args.report.as_str(), "console" | "markdown") {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            config: None,
            scenarios: "mid-distance-pace-chaser".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            samples: Some(2),
            policy: None,
            accuracy_mode: false,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("homestretch-{}-{name}", std::process::id()))
    }

    fn sample_result() -> ScenarioResult {
        ScenarioResult {
            scenario_name: "front-runner-sprint".to_string(),
            seed: 7,
            policy: PolicyKind::Game,
            passed: true,
            samples: 1,
            failures: Vec::new(),
            summary: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let selected = expand_scenarios("all");
        assert_eq!(selected.len(), list_scenarios().len());
    }

    #[test]
    fn expand_scenarios_keeps_order_and_drops_unknown_and_repeats() {
        let selected =
            expand_scenarios("exhausted-runaway, bogus ,front-runner-sprint,exhausted-runaway");
        let keys: Vec<&str> = selected.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["exhausted-runaway", "front-runner-sprint"]);
    }

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn policy_arg_maps_to_kind() {
        assert_eq!(PolicyKind::from(PolicyArg::Game), PolicyKind::Game);
        assert_eq!(PolicyKind::from(PolicyArg::Enhanced), PolicyKind::Enhanced);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("late-heal-accuracy"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_json_has_no_trailer() {
        let temp = temp_file("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result()], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let parsed: Vec<ScenarioResult> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed[0].scenario_name, "front-runner-sprint");
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn write_reports_emits_csv_report() {
        let temp = temp_file("report.csv");
        let args = Args {
            report: "csv".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result()], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.starts_with("scenario,seed,policy"));
        assert!(content.contains("front-runner-sprint,7,game,true,1"));
    }

    #[test]
    fn custom_config_loads_and_validates() {
        let good = temp_file("good.json");
        std::fs::write(&good, r#"{"samples": 3, "course": {"distance": 1600}}"#).unwrap();
        let scenario = load_custom_scenario(&good).unwrap();
        assert_eq!(scenario.key, "custom");
        assert_eq!(scenario.config.samples, 3);

        let bad = temp_file("bad.json");
        std::fs::write(&bad, r#"{"course": {"distance": 500}}"#).unwrap();
        let err = load_custom_scenario(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("course.distance"));
        assert!(load_custom_scenario(&temp_file("missing.json")).is_err());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
