//! Mastery CLI
//!
//! The `mastery` command validates curricula and runs unit attempts in the
//! terminal.
//!
//! ## Commands
//!
//! - `validate`: Load and check a curriculum file
//! - `units`: List the units of a curriculum with their pass rules
//! - `score`: Aggregate a list of task scores and apply a threshold
//! - `run`: Take a unit in the terminal until it is passed or abandoned

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, Level};

use mastery_core::{
    aggregate, Curriculum, EngineConfig, GradeResult, PassRule, Route, TaskDescriptor,
    ThresholdGate, ThresholdPolicy, Unit, METRICS,
};
use mastery_engine::{
    AttemptReport, CountdownPurpose, EngineEvent, EventSink, LearnerSignal, Navigator,
    UnitPipeline,
};
use mastery_store::{MemoryScoreStore, ScoreSheet, SheetEntry, UnitKey};

#[derive(Parser)]
#[command(name = "mastery")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mastery-gated multi-task progression", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and engine events
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a curriculum file (.toml or .json)
    Validate {
        /// Curriculum file
        file: PathBuf,
    },

    /// List the units of a curriculum
    Units {
        /// Curriculum file
        file: PathBuf,
    },

    /// Aggregate task scores and apply a pass threshold
    Score {
        /// Max score of each task, in order (e.g. 4,8,6)
        #[arg(long, value_delimiter = ',', required = true)]
        max: Vec<u32>,

        /// Score of each task in order; `-` marks a task without a record
        #[arg(long)]
        scores: String,

        /// Absolute pass threshold
        #[arg(long, conflicts_with = "percent")]
        threshold: Option<u32>,

        /// Pass threshold as a percentage of the maximum, rounded up
        #[arg(long)]
        percent: Option<u32>,
    },

    /// Take a unit in the terminal
    ///
    /// Type an answer and press enter to submit it. Separate multiple
    /// answers with `|`. Commands: `:skip`, `:continue`, `:quit`.
    Run {
        /// Curriculum file
        file: PathBuf,

        /// Unit to take, as phase/step/level
        #[arg(short, long)]
        unit: String,

        /// Backend of record for completions
        #[arg(long, env = "MASTERY_BACKEND_URL")]
        backend_url: Option<String>,

        /// External grading service
        #[arg(long, env = "MASTERY_GRADER_URL")]
        grader_url: Option<String>,

        /// Seconds to show the outcome before moving on
        #[arg(long, env = "MASTERY_OBSERVATION_DELAY_SECS")]
        delay: Option<u64>,

        /// Stop after the first attempt instead of restarting on failure
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    mastery_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Units { file } => cmd_units(&file),
        Commands::Score {
            max,
            scores,
            threshold,
            percent,
        } => cmd_score(&max, &scores, threshold, percent),
        Commands::Run {
            file,
            unit,
            backend_url,
            grader_url,
            delay,
            once,
        } => {
            let mut config = EngineConfig::from_env();
            if let Some(url) = backend_url {
                config = config.with_backend(&url);
            }
            if let Some(url) = grader_url {
                config = config.with_grader(&url);
            }
            if let Some(secs) = delay {
                config = config.with_observation_delay(Duration::from_secs(secs));
            }
            cmd_run(&file, &unit, config, once, cli.json).await
        }
    }
}

fn load(file: &Path) -> Result<Curriculum> {
    Curriculum::load(file).with_context(|| format!("Failed to load curriculum {:?}", file))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let curriculum = load(file)?;
    let tasks: usize = curriculum.units().iter().map(|u| u.tasks().len()).sum();
    println!(
        "{}: {} units, {} tasks (digest {})",
        curriculum.name().unwrap_or("curriculum"),
        curriculum.units().len(),
        tasks,
        curriculum.short_digest()
    );
    Ok(())
}

fn cmd_units(file: &Path) -> Result<()> {
    let curriculum = load(file)?;
    for unit in curriculum.units() {
        println!("{}", unit_line(unit));
    }
    Ok(())
}

fn unit_line(unit: &Unit) -> String {
    let key = unit.key();
    let policy = unit.policy();
    format!(
        "{}/{}/{}  {} tasks  pass {}/{}  -> {}{}",
        key.phase(),
        key.step(),
        key.level(),
        unit.tasks().len(),
        policy.pass_threshold(),
        policy.max_total(),
        unit.routes().advance,
        unit.title().map(|t| format!("  ({t})")).unwrap_or_default()
    )
}

fn cmd_score(max: &[u32], scores: &str, threshold: Option<u32>, percent: Option<u32>) -> Result<()> {
    let scores = parse_scores(scores)?;
    if scores.len() != max.len() {
        bail!(
            "expected {} scores to match --max, got {}",
            max.len(),
            scores.len()
        );
    }

    let tasks: Vec<TaskDescriptor> = max
        .iter()
        .enumerate()
        .map(|(i, m)| TaskDescriptor::new(format!("task{}", i + 1), i as u32, *m))
        .collect();
    for (task, score) in tasks.iter().zip(&scores) {
        if let Some(score) = score {
            if *score > task.max_score {
                bail!("score {} of {} exceeds its max {}", score, task.id, task.max_score);
            }
        }
    }

    let rule = match (threshold, percent) {
        (Some(t), _) => PassRule::Threshold(t),
        (None, Some(p)) => PassRule::Percent(p),
        (None, None) => PassRule::default(),
    };
    let policy = ThresholdPolicy::for_tasks(&tasks, rule).context("Invalid pass rule")?;
    let sheet = ScoreSheet::new(
        tasks
            .iter()
            .zip(scores)
            .map(|(task, score)| SheetEntry {
                task_id: task.id.clone(),
                score,
            })
            .collect(),
    );

    let verdict = ThresholdGate::evaluate(aggregate(&sheet, &tasks), &policy);
    println!(
        "Total: {}/{} (pass at {})",
        verdict.total, verdict.max_total, verdict.pass_threshold
    );
    if verdict.passed {
        println!("PASSED");
    } else {
        println!("FAILED ({} short)", verdict.shortfall());
    }
    Ok(())
}

/// Parse `4,8,-,5`; `-` or an empty field is a task without a record.
fn parse_scores(raw: &str) -> Result<Vec<Option<u32>>> {
    raw.split(',')
        .map(str::trim)
        .map(|field| match field {
            "" | "-" => Ok(None),
            n => n
                .parse()
                .map(Some)
                .with_context(|| format!("invalid score '{n}'")),
        })
        .collect()
}

/// Navigator for the terminal: navigation is a printed line.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: &Route) {
        println!("==> {}", route);
    }
}

async fn cmd_run(file: &Path, unit: &str, config: EngineConfig, once: bool, json: bool) -> Result<()> {
    let curriculum = load(file)?;
    let key: UnitKey = unit
        .parse()
        .with_context(|| format!("Invalid unit '{unit}'"))?;
    let unit = curriculum.unit(&key)?;

    let (events, mut events_rx) = EventSink::channel();
    let pipeline = UnitPipeline::from_config(
        &config,
        Arc::new(MemoryScoreStore::new()),
        Arc::new(PrintNavigator),
    )
    .context("Failed to set up the engine")?
    .with_events(events);

    let (current_tx, current_rx) = watch::channel(None::<String>);
    let (signals_tx, mut signals) = mpsc::channel(16);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let EngineEvent::TaskPresented { task_id, .. } = &event {
                current_tx.send_replace(Some(task_id.clone()));
            }
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            } else if let Some(line) = render_event(&event) {
                println!("{line}");
            }
        }
    });

    // A plain thread, so a pending read never holds up shutdown.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let current = current_rx.borrow().clone();
            if let Some(signal) = parse_command(&line, current.as_deref()) {
                if signals_tx.blocking_send(signal).is_err() {
                    break;
                }
            }
        }
    });

    info!(unit = %key, digest = curriculum.short_digest(), "Starting unit");
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let report = pipeline.run_attempt(unit, &mut signals).await?;
        match &report {
            AttemptReport::Finished { outcome, .. } if outcome.passed => {
                println!("Unit passed after {attempts} attempt(s).");
                break;
            }
            AttemptReport::Finished { .. } if once => break,
            AttemptReport::Finished { .. } => println!("Starting over from the first task."),
            AttemptReport::Abandoned { .. } => {
                println!("Left the unit.");
                break;
            }
        }
    }

    drop(pipeline);
    printer.await.ok();
    METRICS.flush();
    Ok(())
}

/// Turn a line of terminal input into a learner signal.
fn parse_command(line: &str, current_task: Option<&str>) -> Option<LearnerSignal> {
    let trimmed = line.trim();
    match trimmed {
        ":continue" => return Some(LearnerSignal::ContinueNow),
        ":quit" => return Some(LearnerSignal::Leave),
        _ => {}
    }
    let task_id = current_task?.to_string();
    if trimmed == ":skip" {
        return Some(LearnerSignal::Skip { task_id });
    }
    let input = trimmed
        .split('|')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    Some(LearnerSignal::Submit { task_id, input })
}

fn render_event(event: &EngineEvent) -> Option<String> {
    let line = match event {
        EngineEvent::TaskPresented {
            task_id,
            order,
            time_limit_secs,
            ..
        } => match time_limit_secs {
            Some(secs) => format!("\n[{}] {} ({}s)", order + 1, task_id, secs),
            None => format!("\n[{}] {}", order + 1, task_id),
        },
        EngineEvent::SubmissionRejected { reason, .. } => format!("  rejected: {reason}"),
        EngineEvent::TaskEvaluated {
            max_score, result, ..
        } => {
            let note = match result {
                GradeResult::Graded { .. } => "",
                GradeResult::Fallback { .. } => " (offline)",
                GradeResult::Failed { .. } => " (not graded)",
            };
            format!(
                "  {}/{}{}: {}",
                result.score(),
                max_score,
                note,
                result.feedback()
            )
        }
        EngineEvent::TaskSkipped { task_id } => format!("  skipped {task_id}"),
        EngineEvent::Countdown {
            purpose: CountdownPurpose::AutoSubmit { .. },
            remaining_secs,
        } if *remaining_secs <= 5 => format!("  auto-submit in {remaining_secs}s"),
        EngineEvent::Countdown {
            purpose: CountdownPurpose::Transition,
            remaining_secs,
        } => format!("  continuing in {remaining_secs}s (:continue to skip)"),
        EngineEvent::Countdown { .. } => return None,
        EngineEvent::OutcomeReady { outcome } => format!(
            "\nTotal {}/{}, pass at {}: {}",
            outcome.total,
            outcome.max_total,
            outcome.pass_threshold,
            if outcome.passed { "PASSED" } else { "FAILED" }
        ),
        EngineEvent::Navigated { .. } => return None,
    };
    Some(line)
}
