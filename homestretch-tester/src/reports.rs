use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use crate::runner::ScenarioResult;

const CSV_HEADER: &str = "scenario,seed,policy,passed,samples,mean_finish_time,min_finish_time,max_finish_time,max_spurt_rate,hp_exhausted_rate,mean_recalculations,mean_final_hp,rng_draws,digest,duration_ms";

fn tally(results: &[ScenarioResult]) -> (usize, usize, f64) {
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    };
    (total, passed, success_rate)
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "===========================".cyan())?;

    let (total, passed, success_rate) = tally(results);
    writeln!(writer, "Total runs: {total}")?;
    writeln!(writer, "Passed: {}", passed.to_string().green())?;
    writeln!(writer, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(writer, "Success rate: {success_rate:.1}%")?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{} {} (seed {}, {} policy)",
            status,
            result.scenario_name.bold(),
            result.seed,
            result.policy.label()
        )?;
        if let Some(summary) = &result.summary {
            writeln!(
                writer,
                "   Finish: {:.3}s mean [{:.3}, {:.3}] over {} samples",
                summary.mean_finish_time,
                summary.min_finish_time,
                summary.max_finish_time,
                summary.completed
            )?;
            writeln!(
                writer,
                "   Max spurt: {:.1}%  HP exhausted: {:.1}%  Recalcs: {:.2}  Draws: {}",
                summary.max_spurt_rate * 100.0,
                summary.hp_exhausted_rate * 100.0,
                summary.mean_recalculations,
                summary.total_rng_draws
            )?;
            writeln!(writer, "   Digest: {:#018x}", summary.digest)?;
        }
        writeln!(writer, "   Time: {:?}", result.duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.duration),
        results.iter().max_by_key(|r| r.duration),
    ) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Homestretch Scenario Results\n")?;

    let (total, passed, success_rate) = tally(results);
    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total runs**: {total}")?;
    writeln!(writer, "- **Passed**: {passed}")?;
    writeln!(writer, "- **Failed**: {}", total - passed)?;
    writeln!(writer, "- **Success rate**: {success_rate:.1}%\n")?;

    writeln!(writer, "## Detailed Results\n")?;
    writeln!(
        writer,
        "| Scenario | Seed | Policy | Status | Mean finish (s) | Max spurt | HP exhausted | Recalcs |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        match &result.summary {
            Some(summary) => writeln!(
                writer,
                "| {} | {} | {} | {} | {:.3} | {:.1}% | {:.1}% | {:.2} |",
                result.scenario_name,
                result.seed,
                result.policy.label(),
                status,
                summary.mean_finish_time,
                summary.max_spurt_rate * 100.0,
                summary.hp_exhausted_rate * 100.0,
                summary.mean_recalculations
            )?,
            None => writeln!(
                writer,
                "| {} | {} | {} | {} | - | - | - | - |",
                result.scenario_name,
                result.seed,
                result.policy.label(),
                status
            )?,
        }
    }

    let failing: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();
    if !failing.is_empty() {
        writeln!(writer, "\n## Failures\n")?;
        for result in failing {
            writeln!(writer, "### {} (seed {})\n", result.scenario_name, result.seed)?;
            for failure in &result.failures {
                writeln!(writer, "- {failure}")?;
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}

pub fn generate_csv_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    for result in results {
        write!(
            writer,
            "{},{},{},{},{}",
            result.scenario_name,
            result.seed,
            result.policy.label(),
            result.passed,
            result.samples
        )?;
        match &result.summary {
            Some(s) => write!(
                writer,
                ",{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{:016x}",
                s.mean_finish_time,
                s.min_finish_time,
                s.max_finish_time,
                s.max_spurt_rate,
                s.hp_exhausted_rate,
                s.mean_recalculations,
                s.mean_final_hp,
                s.total_rng_draws,
                s.digest
            )?,
            None => write!(writer, ",,,,,,,,,")?,
        }
        writeln!(writer, ",{}", result.duration.as_millis())?;
    }
    Ok(())
}
