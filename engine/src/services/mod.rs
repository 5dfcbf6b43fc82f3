//! External service seams
//!
//! The engine talks to the source-control host and the text-generation model
//! only through these traits. Concrete HTTP implementations live in
//! [`crate::http`]; tests substitute in-memory stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Kind of a directory listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,

    /// Path from the repository root
    pub path: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    #[serde(default)]
    pub size: u64,
}

/// A file read at a specific ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,

    /// Blob identity token required to update the file
    pub sha: String,

    pub content: String,
}

/// Source-control operations the engine consumes
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// List a directory (`""` is the repository root)
    async fn list_contents(&self, repo: &str, path: &str) -> Result<Vec<ContentEntry>, EngineError>;

    /// Read a file from the default branch as text
    async fn get_file_content(&self, repo: &str, path: &str) -> Result<String, EngineError>;

    /// Name of the repository's default branch
    async fn default_branch(&self, repo: &str) -> Result<String, EngineError>;

    /// Commit sha at the tip of `branch`
    async fn branch_head_sha(&self, repo: &str, branch: &str) -> Result<String, EngineError>;

    /// Create `branch` pointing at `sha`
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), EngineError>;

    /// Read a file at `git_ref`, `None` when it does not exist there
    async fn get_file_at_ref(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, EngineError>;

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<(), EngineError>;

    /// Replace a file; `sha` is the identity token of the content being replaced
    async fn update_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> Result<(), EngineError>;
}

/// Free-text generation. Output is untrusted.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;
}
