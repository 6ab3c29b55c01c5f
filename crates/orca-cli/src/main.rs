//! Orca CLI - tiered task orchestration
//!
//! Usage:
//!   orca score <f1> .. <f7>           Score seven complexity factors
//!   orca spec --tier <tier> <request>  Build a specification
//!   orca init [path]                   Write .orca/config.toml
//!   orca check-plan <file>             Screen a plan or diff for banned patterns
//!   orca check-shell <command>         Check a command against the shell policy
//!   orca run <scenario.json>           Run a scripted workflow scenario

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use orca_agent::{
    ScriptedReply, ScriptedWorker, ShellPolicy, ShellVerdict, WorkerDispatcher, WorkerResponse,
};
use orca_core::{
    ComplexityFactor, ComplexityFactors, OrcaConfig, TaskStatus, WorkerId, WorkflowConfig,
};
use orca_metrics::MetricsCollector;
use orca_orchestrator::{TaskOutcome, TaskRequest, WorkflowEngine};
use orca_planning::{ComplexityScorer, SpecBuilder};
use orca_validation::{
    GeneralizationCheck, QualityReport, RegexBannedPatterns, ScriptedQualityChecks,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orca")]
#[command(author, version, about = "Tiered workflow orchestration for stateless workers")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root holding .orca/config.toml
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score seven complexity factors (each 0, 1 or 2)
    Score {
        /// architectural_scope integration_points risk_level implementation_time
        /// testing_requirements performance_impact planning_needed
        #[arg(num_args = 7, required = true)]
        factors: Vec<u8>,
    },

    /// Build the specification a tier calls for
    Spec {
        /// simple, medium or complex
        #[arg(long)]
        tier: String,

        /// Request text
        request: String,
    },

    /// Write a default .orca/config.toml
    Init {
        /// Repository path (defaults to --repo)
        path: Option<PathBuf>,
    },

    /// Screen a plan or diff for banned patterns
    CheckPlan {
        file: PathBuf,
    },

    /// Check a shell command against the configured policy
    CheckShell {
        command: String,
    },

    /// Run a scripted workflow scenario
    Run {
        /// Scenario JSON: a task request plus scripted worker replies
        scenario: PathBuf,

        /// Append invocation analytics as JSON lines
        #[arg(long, value_name = "FILE")]
        metrics_out: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Replies for one scripted worker
#[derive(Debug, Default, Deserialize)]
struct WorkerScript {
    #[serde(default)]
    replies: Vec<ScriptedReply>,
    /// Repeated once the replies run out
    #[serde(default)]
    fallback: Option<WorkerResponse>,
}

/// A scenario file for `orca run`
#[derive(Debug, Deserialize)]
struct Scenario {
    request: TaskRequest,
    /// Overrides `[workflow]` from the repository config
    #[serde(default)]
    workflow: Option<WorkflowConfig>,
    #[serde(default)]
    workers: BTreeMap<WorkerId, WorkerScript>,
    /// Static-check results in order; passing once exhausted
    #[serde(default)]
    quality: Vec<QualityReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Score { factors } => cmd_score(&factors),
        Commands::Spec { tier, request } => cmd_spec(&tier, &request),
        Commands::Init { path } => cmd_init(path.as_deref().unwrap_or(&cli.repo)),
        Commands::CheckPlan { file } => cmd_check_plan(&cli.repo, &file),
        Commands::CheckShell { command } => cmd_check_shell(&cli.repo, &command),
        Commands::Run {
            scenario,
            metrics_out,
            json,
        } => cmd_run(&cli.repo, &scenario, metrics_out.as_deref(), json).await,
    }
}

fn cmd_score(values: &[u8]) -> Result<()> {
    let values: [u8; 7] = values
        .try_into()
        .context("exactly seven factor values are required")?;
    let factors = ComplexityFactors::from_array(values);
    let score = ComplexityScorer::score(&factors)?;

    for factor in ComplexityFactor::ALL {
        println!("  {:<22} {}", factor.to_string(), factors.get(factor));
    }
    println!("Score: {}", score);
    Ok(())
}

fn cmd_spec(tier: &str, request: &str) -> Result<()> {
    match SpecBuilder::build_from_str(tier, request)? {
        Some(spec) => print!("{}", spec.to_markdown()),
        None => println!("No specification for the simple tier; proceed to implementation."),
    }
    Ok(())
}

fn cmd_init(path: &Path) -> Result<()> {
    info!("Initializing Orca in {:?}", path);
    OrcaConfig::write_default(path)?;
    println!("Initialized Orca in {:?}", path);
    println!("Created:");
    println!("  .orca/config.toml");
    Ok(())
}

fn cmd_check_plan(repo: &Path, file: &Path) -> Result<()> {
    let config = OrcaConfig::load_or_default(repo)?;
    let checks = RegexBannedPatterns::from_config(&config.banned_patterns)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {:?}", file))?;

    let report = checks.check_generalization(&content);
    if report.is_clean() {
        println!("No banned patterns ({} checked)", checks.len());
        return Ok(());
    }
    for violation in &report.violations {
        println!("  {}", violation);
    }
    bail!("{} banned pattern(s) found", report.violations.len())
}

fn cmd_check_shell(repo: &Path, command: &str) -> Result<()> {
    let config = OrcaConfig::load_or_default(repo)?;
    match ShellPolicy::from_config(&config.shell).check(command) {
        ShellVerdict::Passthrough => println!("allowed (passthrough)"),
        ShellVerdict::Allowed => println!("allowed"),
        ShellVerdict::Denied(reason) => bail!("denied: {}", reason),
    }
    Ok(())
}

async fn cmd_run(
    repo: &Path,
    scenario_path: &Path,
    metrics_out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let content = tokio::fs::read_to_string(scenario_path)
        .await
        .context("Failed to read scenario file")?;
    let scenario: Scenario =
        serde_json::from_str(&content).context("Failed to parse scenario JSON")?;

    let mut config = OrcaConfig::load_or_default(repo)?;
    if let Some(workflow) = scenario.workflow {
        config.workflow = workflow;
    }

    let mut dispatcher = WorkerDispatcher::new();
    for (id, script) in scenario.workers {
        let mut worker = ScriptedWorker::new(id, script.replies);
        if let Some(fallback) = script.fallback {
            worker = worker.with_fallback(fallback);
        }
        dispatcher.register(Arc::new(worker));
    }

    let metrics = Arc::new(MetricsCollector::new());
    let engine = WorkflowEngine::from_config(&config, repo, dispatcher)?
        .with_quality_checks(Arc::new(ScriptedQualityChecks::new(scenario.quality)))
        .with_metrics(metrics.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = engine.run_with_cancel(scenario.request, cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
        println!();
        print!("{}", metrics.summary().await);
    }

    if let Some(path) = metrics_out {
        let written = metrics.export_jsonl(path).await?;
        info!("Wrote {} metrics records to {:?}", written, path);
    }

    if outcome.status() == TaskStatus::Escalated {
        bail!("task {} escalated", outcome.task.id);
    }
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome) {
    let task = &outcome.task;
    println!("Task {}: {}", task.id, task.description);
    println!("  Kind: {}  Score: {}  Status: {}", task.kind, task.score, task.status);

    let visited: Vec<String> = outcome.visited.iter().map(|s| s.to_string()).collect();
    println!("  Steps: {}", visited.join(" -> "));
    println!("  Invocations: {}", outcome.invocations);

    if !outcome.gate_reports.is_empty() {
        println!("\nGates:");
        for report in &outcome.gate_reports {
            println!("  {} {}", report.gate, report.status);
            for issue in &report.outstanding_issues {
                println!("    - {}", issue);
            }
        }
    }

    println!("\nTODO:");
    for item in &outcome.todos {
        println!("  {}", item.checkbox());
    }

    if let Some(escalation) = &outcome.escalation {
        println!();
        print!("{}", escalation.to_markdown());
    }
}
