//! Application context
//!
//! Every external client is built once here and shared by `Arc`; components
//! never read configuration on their own.

use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::scanner::ScannerOptions;
use crate::analysis::RepositoryAnalyzer;
use crate::app::credentials::Credentials;
use crate::commands::history::CommandHistory;
use crate::commands::pipeline::CommandSafetyPipeline;
use crate::commands::runner::{CommandRunner, ShellRunner};
use crate::deploy::orchestrator::DeploymentOrchestrator;
use crate::deploy::publisher::BranchPublisher;
use crate::deploy::synth::ArtifactSynthesizer;
use crate::errors::EngineError;
use crate::http::gemini::GeminiClient;
use crate::http::github::GitHubClient;
use crate::services::{SourceControl, TextGenerator};
use crate::storage::records::RunRecordSink;
use crate::storage::settings::Settings;

/// Shared handles for one process
pub struct AppContext {
    pub settings: Settings,
    pub scm: Arc<dyn SourceControl>,
    pub ai: Arc<dyn TextGenerator>,
    pub runner: Arc<dyn CommandRunner>,
    pub sink: Arc<dyn RunRecordSink>,
    pub history: CommandHistory,
}

impl AppContext {
    /// Build the HTTP clients from resolved settings
    pub fn from_settings(
        settings: Settings,
        credentials: &Credentials,
        sink: Arc<dyn RunRecordSink>,
    ) -> Result<Self, EngineError> {
        if credentials.github_token.is_none() {
            warn!("GITHUB_TOKEN is not set; only public repositories are readable and publishing will fail");
        }

        let scm = GitHubClient::new(
            &settings.github.base_url,
            credentials.github_token.as_ref(),
            settings.github.timeout(),
        )?;
        let ai = GeminiClient::new(
            &settings.gemini.base_url,
            &settings.gemini.model,
            credentials.require_gemini_api_key()?,
            settings.gemini.timeout(),
        )?;
        let runner = ShellRunner::new(settings.commands.timeout());

        info!(
            "Using GitHub at {} and model {}",
            settings.github.base_url, settings.gemini.model
        );

        Ok(Self::new(
            settings,
            Arc::new(scm),
            Arc::new(ai),
            Arc::new(runner),
            sink,
        ))
    }

    /// Assemble a context from existing handles
    pub fn new(
        settings: Settings,
        scm: Arc<dyn SourceControl>,
        ai: Arc<dyn TextGenerator>,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn RunRecordSink>,
    ) -> Self {
        Self {
            settings,
            scm,
            ai,
            runner,
            sink,
            history: CommandHistory::new(),
        }
    }

    pub fn analyzer(&self) -> RepositoryAnalyzer {
        RepositoryAnalyzer::new(
            self.scm.clone(),
            self.ai.clone(),
            ScannerOptions::from(&self.settings.scanner),
            self.settings.gemini.timeout(),
        )
    }

    pub fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(
            self.analyzer(),
            ArtifactSynthesizer::new(),
            BranchPublisher::new(self.scm.clone(), self.settings.github.default_branch.clone()),
            self.sink.clone(),
        )
    }

    pub fn command_pipeline(&self) -> CommandSafetyPipeline {
        CommandSafetyPipeline::new(
            self.ai.clone(),
            self.runner.clone(),
            self.history.clone(),
            self.sink.clone(),
            self.settings.gemini.timeout(),
        )
    }
}
