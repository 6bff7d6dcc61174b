//! Command-line driver for schedule demos.
//!
//! Three verbs over synthesized rosters: `demo` (one day), `weekly-demo`
//! (multi-day with days-off patterns), and `demand-demo` (demand-aware
//! with solver selection). Every run validates its output; a non-empty
//! violation list maps to a non-zero exit code.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};

use shiftplan::demand::WeeklyDemand;
use shiftplan::demo::sample_associates;
use shiftplan::models::{DaysOffPattern, ScheduleRequest, WeeklyScheduleRequest};
use shiftplan::scheduler::{DemandAwareConfig, ScheduleStats, Scheduler};
use shiftplan::solver::{OptimizationMode, SolverConfig, SolverType};
use shiftplan::validation::ValidationResult;

#[derive(Parser)]
#[command(name = "shiftplan")]
#[command(version, about = "Workforce shift scheduling demos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single-day schedule for a sample roster
    Demo {
        /// Number of associates to synthesize
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Seed for roster synthesis and tie-breaking
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Widen lunch placement as on a busy day
        #[arg(long)]
        busy: bool,

        /// Write the schedule as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate a multi-day schedule with days-off patterns
    WeeklyDemo {
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Number of days to schedule
        #[arg(long, default_value_t = 7)]
        days: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Days-off pattern to enforce
        #[arg(long, value_enum, default_value = "two-consecutive")]
        pattern: PatternArg,

        /// Minimum days off per associate
        #[arg(long, default_value_t = 2)]
        required_days_off: u32,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate a demand-aware schedule with solver selection
    DemandDemo {
        #[arg(long, default_value_t = 12)]
        count: usize,

        #[arg(long, default_value_t = 7)]
        days: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Solver to use
        #[arg(long, value_enum, default_value = "hybrid")]
        solver: SolverArg,

        /// Optimization objective
        #[arg(long, value_enum, default_value = "balanced")]
        mode: ModeArg,

        /// Exact-solver time limit in seconds
        #[arg(long, default_value_t = 5.0)]
        time_limit: f64,

        #[arg(long, value_enum, default_value = "two-consecutive")]
        pattern: PatternArg,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    None,
    TwoConsecutive,
    OneWeekendDay,
    EveryOtherDay,
}

impl From<PatternArg> for DaysOffPattern {
    fn from(value: PatternArg) -> Self {
        match value {
            PatternArg::None => DaysOffPattern::None,
            PatternArg::TwoConsecutive => DaysOffPattern::TwoConsecutive,
            PatternArg::OneWeekendDay => DaysOffPattern::OneWeekendDay,
            PatternArg::EveryOtherDay => DaysOffPattern::EveryOtherDay,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SolverArg {
    Heuristic,
    Cpsat,
    Hybrid,
}

impl From<SolverArg> for SolverType {
    fn from(value: SolverArg) -> Self {
        match value {
            SolverArg::Heuristic => SolverType::Heuristic,
            SolverArg::Cpsat => SolverType::CpSat,
            SolverArg::Hybrid => SolverType::Hybrid,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    MaximizeCoverage,
    MatchDemand,
    MinimizeUndercoverage,
    Balanced,
}

impl From<ModeArg> for OptimizationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::MaximizeCoverage => OptimizationMode::MaximizeCoverage,
            ModeArg::MatchDemand => OptimizationMode::MatchDemand,
            ModeArg::MinimizeUndercoverage => OptimizationMode::MinimizeUndercoverage,
            ModeArg::Balanced => OptimizationMode::Balanced,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .init();

    match run(Cli::parse()) {
        Ok(valid) => {
            if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let start_date = Local::now().date_naive();

    match cli.command {
        Commands::Demo {
            count,
            seed,
            busy,
            output,
        } => {
            let associates = sample_associates(count, &[start_date], seed);
            let request = ScheduleRequest::new(start_date, associates)
                .with_busy_day(busy)
                .with_seed(seed);

            let (schedule, stats) = Scheduler::new().generate_with_stats(&request)?;
            print_day_summary(&stats, &schedule.date);

            let result = shiftplan::validate(&schedule, &request);
            report_validation(&result);
            write_output(output.as_deref(), &schedule)?;
            Ok(result.is_valid)
        }

        Commands::WeeklyDemo {
            count,
            days,
            seed,
            pattern,
            required_days_off,
            output,
        } => {
            let dates = date_range(start_date, days);
            let associates = sample_associates(count, &dates, seed);
            let end_date = *dates.last().expect("at least one day");
            let request = WeeklyScheduleRequest::new(start_date, end_date, associates)
                .with_days_off_pattern(pattern.into())
                .with_required_days_off(required_days_off)
                .with_seed(seed);

            let weekly = shiftplan::generate_weekly(&request)?;
            println!(
                "{} days, {} shifts, fairness {:.1}",
                weekly.days.len(),
                weekly.total_shifts(),
                weekly.fairness.as_ref().map(|f| f.fairness_score).unwrap_or(0.0),
            );

            let result = shiftplan::validate_weekly(&weekly, &request);
            report_validation(&result);
            write_output(output.as_deref(), &weekly)?;
            Ok(result.is_valid)
        }

        Commands::DemandDemo {
            count,
            days,
            seed,
            solver,
            mode,
            time_limit,
            pattern,
            output,
        } => {
            let dates = date_range(start_date, days);
            let associates = sample_associates(count, &dates, seed);
            let end_date = *dates.last().expect("at least one day");
            let request = WeeklyScheduleRequest::new(start_date, end_date, associates)
                .with_days_off_pattern(pattern.into())
                .with_seed(seed);

            let config = DemandAwareConfig {
                solver_type: solver.into(),
                solver_config: SolverConfig::default()
                    .with_time_limit(time_limit)
                    .with_mode(mode.into()),
                ..Default::default()
            };
            let result =
                shiftplan::generate_demand_aware(&request, &WeeklyDemand::new(), &config)?;

            println!(
                "{} days, {} shifts, match {:.1}%, fairness {:.1}",
                result.schedule.days.len(),
                result.schedule.total_shifts(),
                result.overall_match_score,
                result
                    .schedule
                    .fairness
                    .as_ref()
                    .map(|f| f.fairness_score)
                    .unwrap_or(0.0),
            );
            for (date, status) in &result.solver_statuses {
                println!("  {date}: exact solver {status:?}");
            }

            let validation = shiftplan::validate_weekly(&result.schedule, &request);
            report_validation(&validation);
            write_output(output.as_deref(), &result.schedule)?;
            Ok(validation.is_valid)
        }
    }
}

fn date_range(start: NaiveDate, days: u64) -> Vec<NaiveDate> {
    (0..days.max(1))
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .collect()
}

fn print_day_summary(stats: &ScheduleStats, date: &NaiveDate) {
    println!(
        "{date}: {}/{} scheduled, {:.1} h work, coverage {}..{} (avg {:.1})",
        stats.scheduled_associates,
        stats.total_associates,
        stats.total_work_minutes as f64 / 60.0,
        stats.min_coverage,
        stats.max_coverage,
        stats.avg_coverage,
    );
}

fn report_validation(result: &ValidationResult) {
    if result.is_valid {
        println!("validation: ok");
    } else {
        eprintln!("validation: {} violation(s)", result.violations.len());
        for violation in &result.violations {
            eprintln!("  {violation}");
        }
    }
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
}

fn write_output<T: serde::Serialize>(path: Option<&std::path::Path>, value: &T) -> anyhow::Result<()> {
    if let Some(path) = path {
        let json = serde_json::to_string_pretty(value).context("serializing schedule")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
