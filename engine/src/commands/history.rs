//! Shared, append-only command history

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::command::CommandExecutionRecord;

/// Cloneable handle; clones share the same history
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    records: Arc<RwLock<Vec<CommandExecutionRecord>>>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: CommandExecutionRecord) {
        self.records.write().await.push(record);
    }

    /// Copy of all records in append order
    pub async fn snapshot(&self) -> Vec<CommandExecutionRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
