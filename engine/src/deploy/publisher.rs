//! Branch creation and artifact publication

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::deploy::synth::ArtifactSet;
use crate::errors::EngineError;
use crate::models::deployment::{ArtifactPublication, PublishAction};
use crate::services::SourceControl;
use crate::utils::sha256_hash;

pub const BRANCH_PREFIX: &str = "autonomous-deployment-";

/// Deterministic branch name for a run
pub fn branch_name_for(run_id: &str) -> String {
    let short: String = run_id.chars().take(8).collect();
    format!("{}{}", BRANCH_PREFIX, short)
}

/// Writes artifact sets onto a fresh branch
pub struct BranchPublisher {
    scm: Arc<dyn SourceControl>,
    fallback_base_branch: String,
}

impl BranchPublisher {
    /// `fallback_base_branch` is used when the repository's default branch
    /// cannot be looked up
    pub fn new(scm: Arc<dyn SourceControl>, fallback_base_branch: impl Into<String>) -> Self {
        Self {
            scm,
            fallback_base_branch: fallback_base_branch.into(),
        }
    }

    /// Create `branch` at the head of the default branch
    pub async fn create_branch(&self, repo: &str, branch: &str) -> Result<(), EngineError> {
        let base = match self.scm.default_branch(repo).await {
            Ok(name) => name,
            Err(e) => {
                warn!(
                    "Could not resolve default branch of {}, using {}: {}",
                    repo, self.fallback_base_branch, e
                );
                self.fallback_base_branch.clone()
            }
        };

        let sha = self.scm.branch_head_sha(repo, &base).await.map_err(|e| {
            EngineError::DeployError(format!("Failed to create deployment branch: {}", e))
        })?;
        self.scm.create_branch(repo, branch, &sha).await.map_err(|e| {
            EngineError::DeployError(format!("Failed to create deployment branch: {}", e))
        })?;

        info!("Created branch {} from {} ({})", branch, base, sha);
        Ok(())
    }

    /// Write every artifact. A failing file is recorded and skipped.
    pub async fn publish_files(
        &self,
        repo: &str,
        branch: &str,
        files: &ArtifactSet,
    ) -> Vec<ArtifactPublication> {
        let mut outcomes = Vec::with_capacity(files.len());

        for (path, content) in files {
            let digest = sha256_hash(content.as_bytes());
            let outcome = match self.publish_file(repo, branch, path, content).await {
                Ok(action) => {
                    debug!("{:?} {} on {}", action, path, branch);
                    ArtifactPublication {
                        path: path.clone(),
                        action,
                        digest,
                        error: None,
                    }
                }
                Err(e) => {
                    error!("Error creating/updating {}: {}", path, e);
                    ArtifactPublication {
                        path: path.clone(),
                        action: PublishAction::Failed,
                        digest,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn publish_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<PublishAction, EngineError> {
        let existing = match self.scm.get_file_at_ref(repo, path, branch).await {
            Ok(existing) => existing,
            Err(e) => {
                // Lookup failures are treated as absence; creation reports
                // the real problem if there is one
                warn!("Could not check {} on {}: {}", path, branch, e);
                None
            }
        };

        match existing {
            Some(file) => {
                let message = format!("Update {} for autonomous deployment", path);
                self.scm
                    .update_file(repo, path, content, &message, &file.sha, branch)
                    .await?;
                Ok(PublishAction::Updated)
            }
            None => {
                let message = format!("Add {} for autonomous deployment", path);
                self.scm.create_file(repo, path, content, &message, branch).await?;
                Ok(PublishAction::Created)
            }
        }
    }
}
