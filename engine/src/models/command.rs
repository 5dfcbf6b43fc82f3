//! Command pipeline models

use serde::{Deserialize, Serialize};

use crate::utils::now_rfc3339;

/// Safety classification, ordered from least to most risky
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Dangerous,
}

impl SafetyLevel {
    /// Only safe and caution commands may be spawned
    pub fn is_executable(&self) -> bool {
        !matches!(self, SafetyLevel::Dangerous)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Dangerous => "dangerous",
        }
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One proposed shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCandidate {
    pub command: String,

    #[serde(default)]
    pub explanation: String,

    pub safety_level: SafetyLevel,
}

/// Decomposition of a natural-language request into candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAnalysis {
    pub commands: Vec<CommandCandidate>,
    pub overall_safety: SafetyLevel,
    pub execution_recommended: bool,

    /// Why the analysis failed closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandAnalysis {
    /// Empty, dangerous, not recommended
    pub fn fail_closed(reason: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            overall_safety: SafetyLevel::Dangerous,
            execution_recommended: false,
            error: Some(reason.into()),
        }
    }

    pub fn has_dangerous(&self) -> bool {
        self.commands
            .iter()
            .any(|c| c.safety_level == SafetyLevel::Dangerous)
    }
}

/// Result of handling one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecutionRecord {
    pub command: String,
    pub working_dir: String,
    pub timestamp: String,
    pub success: bool,
    pub output: String,
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,

    /// Set when the command was never spawned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl CommandExecutionRecord {
    pub fn skipped(command: &str, working_dir: &str, reason: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            working_dir: working_dir.to_string(),
            timestamp: now_rfc3339(),
            success: false,
            output: String::new(),
            error: String::new(),
            return_code: None,
            skipped_reason: Some(reason.into()),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.skipped_reason.is_some()
    }
}

/// All records produced by one `execute` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBatch {
    pub batch_id: String,
    pub working_dir: String,
    pub started_at: String,
    pub records: Vec<CommandExecutionRecord>,

    /// Set when the batch could not be handed to the record sink
    #[serde(skip)]
    pub record_error: Option<String>,
}

impl CommandBatch {
    pub fn executed(&self) -> impl Iterator<Item = &CommandExecutionRecord> {
        self.records.iter().filter(|r| !r.was_skipped())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &CommandExecutionRecord> {
        self.records.iter().filter(|r| r.was_skipped())
    }
}
