//! End-to-end deployment orchestration

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::RepositoryAnalyzer;
use crate::deploy::fsm::{RunEvent, RunFsm};
use crate::deploy::publisher::{branch_name_for, BranchPublisher};
use crate::deploy::synth::ArtifactSynthesizer;
use crate::errors::EngineError;
use crate::models::deployment::{DeploymentLog, StepName};
use crate::storage::records::RunRecordSink;
use crate::utils::generate_uuid;

/// Drives analyze -> synthesize -> publish for one repository per call
pub struct DeploymentOrchestrator {
    analyzer: RepositoryAnalyzer,
    synthesizer: ArtifactSynthesizer,
    publisher: BranchPublisher,
    sink: Arc<dyn RunRecordSink>,
}

impl DeploymentOrchestrator {
    pub fn new(
        analyzer: RepositoryAnalyzer,
        synthesizer: ArtifactSynthesizer,
        publisher: BranchPublisher,
        sink: Arc<dyn RunRecordSink>,
    ) -> Self {
        Self {
            analyzer,
            synthesizer,
            publisher,
            sink,
        }
    }

    /// Run the pipeline under a fresh run id
    pub async fn execute(&self, repo: &str) -> DeploymentLog {
        self.execute_with_id(repo, &generate_uuid()).await
    }

    /// Run the pipeline and return the sealed log.
    ///
    /// Never fails: errors end up in the log. The log is handed to the
    /// record sink before returning; a sink failure is reported in
    /// `record_error`.
    pub async fn execute_with_id(&self, repo: &str, deployment_id: &str) -> DeploymentLog {
        info!("Starting deployment {} for {}", deployment_id, repo);

        let mut log = DeploymentLog::new(deployment_id, repo);
        let mut fsm = RunFsm::new();

        match self.run_steps(repo, &mut log, &mut fsm).await {
            Ok(()) => {
                if let Err(e) = fsm.process(RunEvent::Finish) {
                    error!("Run {} ended in unexpected state: {}", deployment_id, e);
                }
                log.seal_completed();
                let failed = log.failed_artifacts().count();
                if failed > 0 {
                    warn!(
                        "Deployment {} completed with {} unpublished artifacts",
                        deployment_id, failed
                    );
                } else {
                    info!("Deployment {} completed", deployment_id);
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!("Deployment {} failed: {}", deployment_id, message);
                if let Err(e) = fsm.process(RunEvent::Fail(message.clone())) {
                    error!("Run {} could not be marked failed: {}", deployment_id, e);
                }
                log.seal_failed(message);
            }
        }

        if let Err(e) = self.sink.append_deployment(&log).await {
            error!("Failed to persist deployment log {}: {}", deployment_id, e);
            log.record_error = Some(e.to_string());
        }
        log
    }

    async fn run_steps(
        &self,
        repo: &str,
        log: &mut DeploymentLog,
        fsm: &mut RunFsm,
    ) -> Result<(), EngineError> {
        // 1. Analyze
        fsm.process(RunEvent::BeginAnalysis)?;
        log.begin_step(StepName::RepositoryAnalysis);
        let analysis = self.analyzer.analyze(repo).await?;
        log.complete_step();
        let strategy = analysis.deployment_strategy.clone();
        log.analysis = Some(analysis);

        // 2. Synthesize
        fsm.process(RunEvent::BeginGeneration)?;
        log.begin_step(StepName::DeploymentFilesGeneration);
        let files = self.synthesizer.synthesize(repo, &strategy);
        log.deployment_files = files.keys().cloned().collect();
        log.complete_step();

        // 3. Publish
        fsm.process(RunEvent::BeginPublication)?;
        log.begin_step(StepName::DeploymentBranchCreation);
        let branch = branch_name_for(&log.deployment_id);
        self.publisher.create_branch(repo, &branch).await?;
        log.published_files = self.publisher.publish_files(repo, &branch, &files).await;
        log.deployment_branch = Some(branch);
        log.complete_step();

        Ok(())
    }
}
