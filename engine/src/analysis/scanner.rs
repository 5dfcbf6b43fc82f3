//! Repository structure scanner.
//!
//! Walks a remote repository through directory listings. Sibling
//! directories are listed concurrently; a semaphore bounds how many listing
//! calls are in flight at once. A listing that fails is recorded as an
//! empty, degraded directory and the walk carries on.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::models::repository::{RepositoryStructure, StructureNode};
use crate::services::{ContentEntry, EntryKind, SourceControl};

/// Scanner settings
#[derive(Debug, Clone, Copy)]
pub struct ScannerOptions {
    /// Maximum directory listings in flight
    pub max_concurrency: usize,

    /// Directories deeper than this are recorded degraded without listing
    pub max_depth: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_depth: 16,
        }
    }
}

/// Builds a [`RepositoryStructure`] from a remote repository
pub struct StructureScanner {
    scm: Arc<dyn SourceControl>,
    permits: Arc<Semaphore>,
    max_depth: usize,
}

impl StructureScanner {
    pub fn new(scm: Arc<dyn SourceControl>, options: ScannerOptions) -> Self {
        Self {
            scm,
            permits: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
            max_depth: options.max_depth,
        }
    }

    /// Scan the whole repository.
    ///
    /// Only a failure to list the root is returned as an error.
    pub async fn scan(&self, repo: &str) -> Result<RepositoryStructure, EngineError> {
        self.scan_path(repo, "").await
    }

    /// Scan the subtree rooted at `path`
    pub async fn scan_path(&self, repo: &str, path: &str) -> Result<RepositoryStructure, EngineError> {
        info!("Scanning repository structure: {} (path: {:?})", repo, path);

        let entries = self.list(repo, path).await?;
        let structure = self.build(repo, entries, 1).await;

        let degraded = structure.degraded_paths();
        if !degraded.is_empty() {
            warn!("Scan of {} degraded {} directories: {:?}", repo, degraded.len(), degraded);
        }
        info!("Scan of {} found {} files", repo, structure.file_count());
        Ok(structure)
    }

    async fn list(&self, repo: &str, path: &str) -> Result<Vec<ContentEntry>, EngineError> {
        let _permit = self.permits.acquire().await.ok();
        self.scm.list_contents(repo, path).await
    }

    fn build<'a>(
        &'a self,
        repo: &'a str,
        entries: Vec<ContentEntry>,
        depth: usize,
    ) -> BoxFuture<'a, RepositoryStructure> {
        async move {
            let mut structure = RepositoryStructure::new();
            let mut subdirs = Vec::new();

            for entry in entries {
                match entry.kind {
                    EntryKind::Dir => subdirs.push(self.scan_dir(repo, entry, depth)),
                    _ => structure.insert(entry.name, StructureNode::file(entry.size, entry.path)),
                }
            }

            for (name, node) in join_all(subdirs).await {
                structure.insert(name, node);
            }
            structure
        }
        .boxed()
    }

    async fn scan_dir(&self, repo: &str, entry: ContentEntry, depth: usize) -> (String, StructureNode) {
        if depth > self.max_depth {
            warn!("Not descending into {}: depth limit {} reached", entry.path, self.max_depth);
            return (entry.name, StructureNode::degraded_directory());
        }

        match self.list(repo, &entry.path).await {
            Ok(children) => {
                debug!("Listed {} ({} entries)", entry.path, children.len());
                let contents = self.build(repo, children, depth + 1).await;
                (entry.name, StructureNode::directory(contents))
            }
            Err(e) => {
                warn!("Failed to list {}: {}", entry.path, e);
                (entry.name, StructureNode::degraded_directory())
            }
        }
    }
}
