//! Deployment run models

use serde::{Deserialize, Serialize};

use crate::models::repository::{RepositoryStructure, TechStack};
use crate::models::strategy::{DeploymentStrategy, StrategySource};
use crate::utils::now_rfc3339;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Started,
    Completed,
    Failed,
}

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    RepositoryAnalysis,
    DeploymentFilesGeneration,
    DeploymentBranchCreation,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::RepositoryAnalysis => "repository_analysis",
            StepName::DeploymentFilesGeneration => "deployment_files_generation",
            StepName::DeploymentBranchCreation => "deployment_branch_creation",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step entry in a run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "step")]
    pub name: StepName,
    pub status: StepStatus,

    /// When the step started
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output of the analysis step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub repo_name: String,
    pub structure: RepositoryStructure,
    pub tech_stack: TechStack,
    pub deployment_strategy: DeploymentStrategy,
    pub strategy_source: StrategySource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_fallback_reason: Option<String>,

    pub analysis_timestamp: String,
}

/// What happened when one artifact was written to the branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishAction {
    Created,
    Updated,
    Failed,
}

/// Publication outcome for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPublication {
    pub path: String,
    pub action: PublishAction,

    /// SHA-256 of the synthesized content
    pub digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit record of one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentLog {
    pub deployment_id: String,
    pub repo_name: String,
    pub start_time: String,
    pub steps: Vec<Step>,
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RepositoryAnalysis>,

    #[serde(default)]
    pub deployment_files: Vec<String>,

    #[serde(default)]
    pub published_files: Vec<ArtifactPublication>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Set when the sealed log could not be handed to the record sink
    #[serde(skip)]
    pub record_error: Option<String>,
}

impl DeploymentLog {
    pub fn new(deployment_id: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            repo_name: repo_name.into(),
            start_time: now_rfc3339(),
            steps: Vec::new(),
            status: RunStatus::Started,
            analysis: None,
            deployment_files: Vec::new(),
            published_files: Vec::new(),
            deployment_branch: None,
            error: None,
            end_time: None,
            record_error: None,
        }
    }

    pub fn begin_step(&mut self, name: StepName) {
        self.steps.push(Step {
            name,
            status: StepStatus::Started,
            timestamp: now_rfc3339(),
            finished_at: None,
            error: None,
        });
    }

    /// Mark the most recent step completed
    pub fn complete_step(&mut self) {
        if let Some(step) = self.open_step_mut() {
            step.status = StepStatus::Completed;
            step.finished_at = Some(now_rfc3339());
        }
    }

    /// Mark the most recent step failed, if one is still open
    pub fn fail_step(&mut self, error: &str) {
        if let Some(step) = self.open_step_mut() {
            step.status = StepStatus::Failed;
            step.finished_at = Some(now_rfc3339());
            step.error = Some(error.to_string());
        }
    }

    fn open_step_mut(&mut self) -> Option<&mut Step> {
        self.steps
            .last_mut()
            .filter(|step| step.status == StepStatus::Started)
    }

    pub fn seal_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.end_time = Some(now_rfc3339());
    }

    pub fn seal_failed(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.fail_step(&error);
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.end_time = Some(now_rfc3339());
    }

    pub fn is_sealed(&self) -> bool {
        self.status != RunStatus::Started
    }

    pub fn step(&self, name: StepName) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Artifacts written to the branch
    pub fn published(&self) -> impl Iterator<Item = &ArtifactPublication> {
        self.published_files
            .iter()
            .filter(|p| p.action != PublishAction::Failed)
    }

    /// Artifacts that could not be written
    pub fn failed_artifacts(&self) -> impl Iterator<Item = &ArtifactPublication> {
        self.published_files
            .iter()
            .filter(|p| p.action == PublishAction::Failed)
    }
}
