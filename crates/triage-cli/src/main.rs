//! `triage` command-line driver
//!
//! # Commands
//!
//! - `index`: rebuild the playbook index from the runbook directory
//! - `search`: similarity search over indexed playbooks
//! - `runbooks`: list indexed playbooks
//! - `run`: triage one alert payload
//! - `evaluate`: score the pipeline against golden cases
//! - `feedback`: append operator feedback for a triaged incident
//!
//! Exit codes: 0 success, 1 unexpected fault, 2 invalid input,
//! 3 backend unavailable.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};
use triage_core::{FeedbackRecord, TriageConfig, TriageError, TriageSystem};
use triage_model::{Category, IncidentAlert, IncidentContext, Severity, TriageResult};

mod output;

/// Incident triage: classify, analyse and plan from playbooks
#[derive(Parser)]
#[command(name = "triage")]
#[command(version)]
#[command(about = "Retrieval-grounded incident triage")]
#[command(propagate_version = true)]
struct Cli {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the playbook index
    Index,
    /// Search playbooks by similarity
    Search(SearchArgs),
    /// List indexed playbooks
    Runbooks,
    /// Triage an alert payload
    Run(RunArgs),
    /// Evaluate against golden cases
    Evaluate(EvaluateArgs),
    /// Record operator feedback
    Feedback(FeedbackArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query
    query: String,
    /// Number of results (configured default when omitted)
    #[arg(long)]
    top_k: Option<usize>,
    /// Restrict to one category, e.g. "Database"
    #[arg(long)]
    category: Option<Category>,
}

#[derive(Args)]
struct RunArgs {
    /// Alert JSON file
    #[arg(long)]
    alert: PathBuf,
    /// Raw log file attached to the incident
    #[arg(long)]
    logs: Option<PathBuf>,
    /// Extra operator context
    #[arg(long)]
    context: Option<String>,
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Write the summary as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct FeedbackArgs {
    /// Incident identifier
    #[arg(long)]
    incident: String,
    /// Severity the incident turned out to have
    #[arg(long)]
    severity: Severity,
    /// Category the incident turned out to have
    #[arg(long)]
    category: Category,
    /// Accuracy rating in [0, 1]
    #[arg(long)]
    accuracy: f64,
    /// The plan helped resolve the incident
    #[arg(long)]
    helpful: bool,
    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TriageError>() {
        Some(e) if e.is_caller_error() => 2,
        Some(e) if e.is_backend_unavailable() => 3,
        _ => 1,
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TriageConfig> {
    let config = match path {
        Some(path) => TriageConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TriageConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    // feedback needs no backends
    if let Commands::Feedback(args) = &cli.command {
        return feedback(&config, args).await;
    }

    let system = TriageSystem::initialize(config).await?;
    match cli.command {
        Commands::Index => {
            let report = system.reindex().await?;
            println!(
                "Indexed {} of {} playbooks ({} failed)",
                report.indexed, report.discovered, report.failed
            );
        }
        Commands::Search(args) => {
            let hits = system.search(&args.query, args.top_k, args.category).await?;
            print!("{}", output::search_hits(&hits));
        }
        Commands::Runbooks => {
            print!("{}", output::runbook_list(&system.retrieval().list_all()));
        }
        Commands::Run(args) => {
            let ctx = incident_context(&args).await?;
            let result = system.triage(&ctx).await?;
            print_result(&result, args.json)?;
        }
        Commands::Evaluate(args) => {
            let evaluator = system.evaluator();
            let summary = match &args.report {
                Some(path) => evaluator.generate_report(path).await?,
                None => evaluator.evaluate_all().await?,
            };
            match summary {
                Some(summary) => print!("{}", output::evaluation(&summary)),
                None => println!("No golden cases found"),
            }
        }
        Commands::Feedback(_) => {}
    }
    Ok(())
}

async fn incident_context(args: &RunArgs) -> anyhow::Result<IncidentContext> {
    let payload = tokio::fs::read_to_string(&args.alert)
        .await
        .with_context(|| format!("reading alert {}", args.alert.display()))?;
    let alert = IncidentAlert::from_json(&payload).map_err(TriageError::from)?;
    let mut ctx = IncidentContext::new(alert).map_err(TriageError::from)?;

    if let Some(path) = &args.logs {
        let logs = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading logs {}", path.display()))?;
        ctx = ctx.with_logs(logs);
    }
    if let Some(extra) = &args.context {
        ctx = ctx.with_additional_context(extra.clone());
    }
    Ok(ctx)
}

fn print_result(result: &TriageResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", output::triage_summary(result));
    }
    Ok(())
}

async fn feedback(config: &TriageConfig, args: &FeedbackArgs) -> anyhow::Result<()> {
    let mut record = FeedbackRecord::new(
        args.incident.clone(),
        args.severity,
        args.category,
        args.accuracy,
        args.helpful,
    );
    if let Some(notes) = &args.notes {
        record = record.with_notes(notes.clone());
    }

    let log = triage_core::FeedbackLog::new(config.storage.feedback_file.clone());
    log.append(&record)
        .await
        .with_context(|| format!("appending to {}", log.path().display()))?;
    println!("Feedback recorded for {}", args.incident);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "triage", "--log-json", "run", "--alert", "a.json", "--logs", "l.txt", "--json",
        ]);
        assert!(cli.log_json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.alert, PathBuf::from("a.json"));
        assert!(args.json);
        assert!(args.context.is_none());
    }

    #[test]
    fn search_category_parses_display_label() {
        let cli = Cli::parse_from(["triage", "search", "pool exhausted", "--category", "Database", "--top-k", "1"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.category, Some(Category::Database));
        assert_eq!(args.top_k, Some(1));
    }

    #[test]
    fn feedback_rejects_unknown_severity() {
        let parsed = Cli::try_parse_from([
            "triage", "feedback", "--incident", "INC-1", "--severity", "SEV9", "--category", "Network",
            "--accuracy", "0.5",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn caller_errors_map_to_exit_code_two() {
        let err = anyhow::Error::from(TriageError::from(triage_model::ValidationError::EmptyField {
            field: "incident_id",
        }));
        assert_eq!(exit_code(&err), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }
}
