//! Append-only persistence of run records
//!
//! Sealed deployment logs and command batches are written once, keyed by
//! their id, and never modified afterwards.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::filesys::dir::Dir;
use crate::models::command::CommandBatch;
use crate::models::deployment::DeploymentLog;
use crate::storage::layout::StorageLayout;

#[async_trait]
pub trait RunRecordSink: Send + Sync {
    async fn append_deployment(&self, log: &DeploymentLog) -> Result<(), EngineError>;

    async fn append_command_batch(&self, batch: &CommandBatch) -> Result<(), EngineError>;

    /// Stored deployment logs, newest first
    async fn list_deployments(&self) -> Result<Vec<DeploymentLog>, EngineError>;
}

/// One JSON file per record under a [`StorageLayout`]
#[derive(Debug, Clone)]
pub struct FileRecordSink {
    deployments: Dir,
    commands: Dir,
}

impl FileRecordSink {
    pub fn new(layout: &StorageLayout) -> Self {
        Self {
            deployments: layout.deployments_dir(),
            commands: layout.commands_dir(),
        }
    }
}

/// Record ids become file names
fn record_file_name(id: &str) -> Result<String, EngineError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(EngineError::ValidationError(format!(
            "invalid record id: {:?}",
            id
        )));
    }
    Ok(format!("{}.json", id))
}

#[async_trait]
impl RunRecordSink for FileRecordSink {
    async fn append_deployment(&self, log: &DeploymentLog) -> Result<(), EngineError> {
        let file = self.deployments.file(&record_file_name(&log.deployment_id)?);
        file.create_json(log).await?;
        debug!("Stored deployment log at {}", file.path().display());
        Ok(())
    }

    async fn append_command_batch(&self, batch: &CommandBatch) -> Result<(), EngineError> {
        let file = self.commands.file(&record_file_name(&batch.batch_id)?);
        file.create_json(batch).await?;
        debug!("Stored command batch at {}", file.path().display());
        Ok(())
    }

    async fn list_deployments(&self) -> Result<Vec<DeploymentLog>, EngineError> {
        let mut logs = Vec::new();
        for path in self.deployments.list_files().await? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file = crate::filesys::file::File::new(&path);
            match file.read_json::<DeploymentLog>().await {
                Ok(log) => logs.push(log),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        sort_newest_first(&mut logs);
        Ok(logs)
    }
}

fn sort_newest_first(logs: &mut [DeploymentLog]) {
    logs.sort_by(|a, b| {
        let a_time = chrono::DateTime::parse_from_rfc3339(&a.start_time).ok();
        let b_time = chrono::DateTime::parse_from_rfc3339(&b.start_time).ok();
        b_time.cmp(&a_time)
    });
}

/// In-process sink
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    deployments: RwLock<Vec<DeploymentLog>>,
    batches: RwLock<Vec<CommandBatch>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn command_batches(&self) -> Vec<CommandBatch> {
        self.batches.read().await.clone()
    }
}

#[async_trait]
impl RunRecordSink for MemoryRecordSink {
    async fn append_deployment(&self, log: &DeploymentLog) -> Result<(), EngineError> {
        let mut deployments = self.deployments.write().await;
        if deployments
            .iter()
            .any(|d| d.deployment_id == log.deployment_id)
        {
            return Err(EngineError::StorageError(format!(
                "deployment {} already recorded",
                log.deployment_id
            )));
        }
        deployments.push(log.clone());
        Ok(())
    }

    async fn append_command_batch(&self, batch: &CommandBatch) -> Result<(), EngineError> {
        let mut batches = self.batches.write().await;
        if batches.iter().any(|b| b.batch_id == batch.batch_id) {
            return Err(EngineError::StorageError(format!(
                "command batch {} already recorded",
                batch.batch_id
            )));
        }
        batches.push(batch.clone());
        Ok(())
    }

    async fn list_deployments(&self) -> Result<Vec<DeploymentLog>, EngineError> {
        let mut logs = self.deployments.read().await.clone();
        sort_newest_first(&mut logs);
        Ok(logs)
    }
}
