//! autodeploy - Entry Point
//!
//! Analyzes a GitHub repository, synthesizes deployment configuration for it
//! and publishes the files on a fresh branch. Also turns natural-language
//! requests into vetted shell commands.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use tracing::{error, info};

use autodeploy::app::context::AppContext;
use autodeploy::app::credentials::Credentials;
use autodeploy::logs::{init_logging, LogOptions};
use autodeploy::models::command::{CommandAnalysis, CommandBatch, SafetyLevel};
use autodeploy::models::deployment::{DeploymentLog, RunStatus};
use autodeploy::storage::layout::{StorageLayout, HOME_ENV};
use autodeploy::storage::records::{FileRecordSink, RunRecordSink};
use autodeploy::storage::settings::Settings;
use autodeploy::utils::version_info;

const USAGE: &str = "usage:
  autodeploy --version
  autodeploy --deploy --repo=<owner/name>
  autodeploy --analyze --repo=<owner/name>
  autodeploy --command --request=\"...\" [--execute] [--dir=<path>]
  autodeploy --history";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    if let Err(e) = run(&cli_args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    let layout = StorageLayout::from_env();
    layout.setup().await.with_context(|| {
        format!(
            "Unable to prepare {} (set {} to a writable directory)",
            layout.base_dir.display(),
            HOME_ENV
        )
    })?;
    let settings_file = layout.settings_file();
    let settings = Settings::load_or_init(&settings_file)
        .await
        .with_context(|| format!("Unable to read settings file {}", settings_file.path().display()))?;

    // Initialize logging
    let log_dir = layout.logs_dir();
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: Some(log_dir.path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let sink: Arc<dyn RunRecordSink> = Arc::new(FileRecordSink::new(&layout));

    if cli_args.contains_key("history") {
        let logs = sink.list_deployments().await?;
        print_history(&logs);
        return Ok(());
    }

    let credentials = Credentials::from_env();

    if cli_args.contains_key("deploy") {
        let repo = require_repo(cli_args)?;
        let context = AppContext::from_settings(settings, &credentials, sink)?;
        let log = context.orchestrator().execute(repo).await;
        println!("{}", serde_json::to_string_pretty(&log)?);
        print_deployment_summary(&log);
        if log.status == RunStatus::Failed {
            bail!("deployment {} failed", log.deployment_id);
        }
        if let Some(err) = &log.record_error {
            bail!("deployment {} was not recorded: {}", log.deployment_id, err);
        }
        return Ok(());
    }

    if cli_args.contains_key("analyze") {
        let repo = require_repo(cli_args)?;
        let context = AppContext::from_settings(settings, &credentials, sink)?;
        let analysis = context.analyzer().analyze(repo).await?;
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    if cli_args.contains_key("command") {
        let request = cli_args
            .get("request")
            .filter(|r| !r.trim().is_empty())
            .context("--request=\"...\" is required")?;
        let working_dir = cli_args
            .get("dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| settings.commands.working_dir.clone());

        let context = AppContext::from_settings(settings, &credentials, sink)?;
        let pipeline = context.command_pipeline();
        let analysis = pipeline.analyze(request).await;
        print_command_analysis(&analysis);

        if cli_args.contains_key("execute") {
            if !analysis.execution_recommended {
                info!("Execution not recommended; dangerous commands will be skipped");
            }
            let batch = pipeline.execute(&analysis.commands, &working_dir).await;
            print_command_batch(&batch);
            if let Some(err) = &batch.record_error {
                bail!("command batch {} was not recorded: {}", batch.batch_id, err);
            }
        }
        return Ok(());
    }

    bail!("no action given\n{}", USAGE)
}

fn require_repo(cli_args: &HashMap<String, String>) -> anyhow::Result<&str> {
    let repo = cli_args
        .get("repo")
        .map(|r| r.trim().trim_matches('/'))
        .context("--repo=<owner/name> is required")?;
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(repo)
        }
        _ => bail!("--repo must look like owner/name, got {:?}", repo),
    }
}

fn paint(level: SafetyLevel) -> ColoredString {
    match level {
        SafetyLevel::Safe => level.as_str().green(),
        SafetyLevel::Caution => level.as_str().yellow(),
        SafetyLevel::Dangerous => level.as_str().red().bold(),
    }
}

fn print_deployment_summary(log: &DeploymentLog) {
    let status = match log.status {
        RunStatus::Completed => "completed".green(),
        RunStatus::Failed => "failed".red().bold(),
        RunStatus::Started => "started".yellow(),
    };
    eprintln!("deployment {} {}", log.deployment_id, status);
    if let Some(branch) = &log.deployment_branch {
        eprintln!("  branch: {}", branch.cyan());
    }
    for publication in &log.published_files {
        eprintln!("  {:?} {}", publication.action, publication.path);
    }
    if let Some(err) = &log.error {
        eprintln!("  error: {}", err.red());
    }
}

fn print_command_analysis(analysis: &CommandAnalysis) {
    println!(
        "overall: {}  recommended: {}",
        paint(analysis.overall_safety),
        analysis.execution_recommended
    );
    if let Some(err) = &analysis.error {
        println!("  {}", err.red());
    }
    for candidate in &analysis.commands {
        println!("  [{}] {}", paint(candidate.safety_level), candidate.command.bold());
        if !candidate.explanation.is_empty() {
            println!("      {}", candidate.explanation.dimmed());
        }
    }
}

fn print_command_batch(batch: &CommandBatch) {
    for record in &batch.records {
        let marker = if let Some(reason) = &record.skipped_reason {
            format!("skipped ({})", reason).yellow()
        } else if record.success {
            "ok".green()
        } else {
            "failed".red()
        };
        println!("{} {}", marker, record.command);
        if !record.output.is_empty() {
            print!("{}", record.output);
        }
        if !record.error.is_empty() {
            eprint!("{}", record.error);
        }
    }
}

fn print_history(logs: &[DeploymentLog]) {
    if logs.is_empty() {
        println!("no deployments recorded");
        return;
    }
    for log in logs {
        let status = match log.status {
            RunStatus::Completed => "completed".green(),
            RunStatus::Failed => "failed".red(),
            RunStatus::Started => "started".yellow(),
        };
        println!(
            "{}  {}  {}  {}",
            log.start_time,
            log.deployment_id,
            log.repo_name.bold(),
            status
        );
    }
}
