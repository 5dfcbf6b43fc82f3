//! Natural-language command pipeline.
//!
//! `analyze` turns a request into safety-tagged candidates and fails closed
//! on any unusable answer. `execute` runs the acceptable candidates one after
//! another and records every candidate, run or skipped.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::commands::guard::{harden_analysis, harden_candidate};
use crate::commands::history::CommandHistory;
use crate::commands::runner::CommandRunner;
use crate::errors::EngineError;
use crate::models::command::{
    CommandAnalysis, CommandBatch, CommandCandidate, CommandExecutionRecord,
};
use crate::services::TextGenerator;
use crate::storage::records::RunRecordSink;
use crate::utils::{extract_json_object, generate_uuid, now_rfc3339};

pub struct CommandSafetyPipeline {
    ai: Arc<dyn TextGenerator>,
    runner: Arc<dyn CommandRunner>,
    history: CommandHistory,
    sink: Arc<dyn RunRecordSink>,
    generation_timeout: Duration,
}

impl CommandSafetyPipeline {
    pub fn new(
        ai: Arc<dyn TextGenerator>,
        runner: Arc<dyn CommandRunner>,
        history: CommandHistory,
        sink: Arc<dyn RunRecordSink>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            ai,
            runner,
            history,
            sink,
            generation_timeout,
        }
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Decompose a request into candidates. Never fails.
    pub async fn analyze(&self, request: &str) -> CommandAnalysis {
        let prompt = build_command_prompt(request);

        let response =
            match tokio::time::timeout(self.generation_timeout, self.ai.generate(&prompt)).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!("Command analysis failed: {}", e);
                    return CommandAnalysis::fail_closed(e.to_string());
                }
                Err(_) => {
                    warn!("Command analysis timed out");
                    return CommandAnalysis::fail_closed(format!(
                        "generation timed out after {}s",
                        self.generation_timeout.as_secs()
                    ));
                }
            };

        match parse_analysis(&response) {
            Ok(analysis) => {
                let analysis = harden_analysis(analysis);
                info!(
                    "Request decomposed into {} commands (overall: {})",
                    analysis.commands.len(),
                    analysis.overall_safety
                );
                analysis
            }
            Err(e) => {
                warn!("Discarding command analysis: {}", e);
                CommandAnalysis::fail_closed(e.to_string())
            }
        }
    }

    /// Run candidates in order. Dangerous ones are recorded as skipped and
    /// never spawned; a failing command does not stop the batch.
    pub async fn execute(&self, candidates: &[CommandCandidate], working_dir: &Path) -> CommandBatch {
        let dir = working_dir.display().to_string();
        let mut batch = CommandBatch {
            batch_id: generate_uuid(),
            working_dir: dir.clone(),
            started_at: now_rfc3339(),
            records: Vec::with_capacity(candidates.len()),
            record_error: None,
        };

        for candidate in candidates {
            let mut candidate = candidate.clone();
            harden_candidate(&mut candidate);

            let record = if candidate.safety_level.is_executable() {
                self.run_one(&candidate.command, working_dir, &dir).await
            } else {
                warn!("Skipping dangerous command: {}", candidate.command);
                CommandExecutionRecord::skipped(
                    &candidate.command,
                    &dir,
                    format!("classified {}", candidate.safety_level),
                )
            };

            self.history.append(record.clone()).await;
            batch.records.push(record);
        }

        if let Err(e) = self.sink.append_command_batch(&batch).await {
            error!("Failed to persist command batch {}: {}", batch.batch_id, e);
            batch.record_error = Some(e.to_string());
        }
        batch
    }

    async fn run_one(&self, command: &str, working_dir: &Path, dir: &str) -> CommandExecutionRecord {
        let timestamp = now_rfc3339();
        match self.runner.run(command, working_dir).await {
            Ok(output) => {
                if !output.success {
                    warn!("`{}` exited with {:?}", command, output.return_code);
                }
                CommandExecutionRecord {
                    command: command.to_string(),
                    working_dir: dir.to_string(),
                    timestamp,
                    success: output.success,
                    output: output.stdout,
                    error: output.stderr,
                    return_code: output.return_code,
                    skipped_reason: None,
                }
            }
            Err(e) => {
                error!("`{}` could not be run: {}", command, e);
                CommandExecutionRecord {
                    command: command.to_string(),
                    working_dir: dir.to_string(),
                    timestamp,
                    success: false,
                    output: String::new(),
                    error: e.to_string(),
                    return_code: None,
                    skipped_reason: None,
                }
            }
        }
    }
}

/// Parse a command analysis embedded in free text
pub fn parse_analysis(text: &str) -> Result<CommandAnalysis, EngineError> {
    let json = extract_json_object(text).ok_or_else(|| {
        EngineError::ValidationError("Could not parse AI response".to_string())
    })?;
    let mut analysis: CommandAnalysis = serde_json::from_str(json)?;
    analysis.commands.retain(|c| !c.command.trim().is_empty());
    analysis.error = None;
    Ok(analysis)
}

pub fn build_command_prompt(request: &str) -> String {
    format!(
        r#"Convert this natural language request to safe shell commands:
"{request}"

Rules:
1. Only generate safe, non-destructive commands
2. Avoid rm -rf, dd, or other dangerous operations
3. Focus on deployment, git, npm, pip, and standard operations
4. Provide explanation for each command

Return JSON format:
{{
    "commands": [
        {{
            "command": "actual shell command",
            "explanation": "what this command does",
            "safety_level": "safe|caution|dangerous"
        }}
    ],
    "overall_safety": "safe|caution|dangerous",
    "execution_recommended": true/false
}}
"#
    )
}
