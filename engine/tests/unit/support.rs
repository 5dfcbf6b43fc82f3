//! In-memory stand-ins for the external services

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use autodeploy::commands::runner::{CommandOutput, CommandRunner};
use autodeploy::errors::EngineError;
use autodeploy::services::{ContentEntry, EntryKind, RemoteFile, SourceControl, TextGenerator};
use autodeploy::utils::sha256_hash;

/// A write the stub accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Created { branch: String, path: String },
    Updated { branch: String, path: String, sha: String },
}

/// Repository held in memory. Directories are implied by file paths.
#[derive(Default)]
pub struct StubRepo {
    files: BTreeMap<String, String>,
    failing_dirs: HashSet<String>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    fail_branch: bool,
    fail_metadata: bool,
    pub branches: Mutex<Vec<(String, String)>>,
    pub writes: Mutex<Vec<Write>>,
    pub list_calls: AtomicUsize,
}

pub const HEAD_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

impl StubRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Listing `path` (or the root, for `""`) fails
    pub fn failing_dir(mut self, path: &str) -> Self {
        self.failing_dirs.insert(path.to_string());
        self
    }

    pub fn failing_read(mut self, path: &str) -> Self {
        self.failing_reads.insert(path.to_string());
        self
    }

    pub fn failing_write(mut self, path: &str) -> Self {
        self.failing_writes.insert(path.to_string());
        self
    }

    pub fn failing_branch(mut self) -> Self {
        self.fail_branch = true;
        self
    }

    /// Repository metadata (default branch) is unavailable
    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn branches(&self) -> Vec<(String, String)> {
        self.branches.lock().unwrap().clone()
    }

    fn children(&self, dir: &str) -> Vec<ContentEntry> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (path, content) in &self.files {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub, _)) => {
                    dirs.insert(sub.to_string());
                }
                None => entries.push(ContentEntry {
                    name: rest.to_string(),
                    path: path.clone(),
                    kind: EntryKind::File,
                    size: content.len() as u64,
                }),
            }
        }
        for sub in dirs {
            entries.push(ContentEntry {
                name: sub.clone(),
                path: format!("{}{}", prefix, sub),
                kind: EntryKind::Dir,
                size: 0,
            });
        }
        entries
    }
}

#[async_trait]
impl SourceControl for StubRepo {
    async fn list_contents(&self, _repo: &str, path: &str) -> Result<Vec<ContentEntry>, EngineError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_dirs.contains(path) {
            return Err(EngineError::SourceControlError(format!("listing {} failed", path)));
        }
        Ok(self.children(path))
    }

    async fn get_file_content(&self, _repo: &str, path: &str) -> Result<String, EngineError> {
        if self.failing_reads.contains(path) {
            return Err(EngineError::SourceControlError(format!("read {} failed", path)));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(path.to_string()))
    }

    async fn default_branch(&self, _repo: &str) -> Result<String, EngineError> {
        if self.fail_metadata {
            return Err(EngineError::SourceControlError("metadata unavailable".to_string()));
        }
        Ok("main".to_string())
    }

    async fn branch_head_sha(&self, _repo: &str, branch: &str) -> Result<String, EngineError> {
        if branch == "main" {
            Ok(HEAD_SHA.to_string())
        } else {
            Err(EngineError::NotFound(format!("branch {}", branch)))
        }
    }

    async fn create_branch(&self, _repo: &str, branch: &str, sha: &str) -> Result<(), EngineError> {
        if self.fail_branch {
            return Err(EngineError::SourceControlError("Reference already exists".to_string()));
        }
        self.branches
            .lock()
            .unwrap()
            .push((branch.to_string(), sha.to_string()));
        Ok(())
    }

    async fn get_file_at_ref(
        &self,
        _repo: &str,
        path: &str,
        _git_ref: &str,
    ) -> Result<Option<RemoteFile>, EngineError> {
        Ok(self.files.get(path).map(|content| RemoteFile {
            path: path.to_string(),
            sha: sha256_hash(content.as_bytes()),
            content: content.clone(),
        }))
    }

    async fn create_file(
        &self,
        _repo: &str,
        path: &str,
        _content: &str,
        _message: &str,
        branch: &str,
    ) -> Result<(), EngineError> {
        if self.failing_writes.contains(path) {
            return Err(EngineError::SourceControlError(format!("write {} rejected", path)));
        }
        self.writes.lock().unwrap().push(Write::Created {
            branch: branch.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    async fn update_file(
        &self,
        _repo: &str,
        path: &str,
        _content: &str,
        _message: &str,
        sha: &str,
        branch: &str,
    ) -> Result<(), EngineError> {
        if self.failing_writes.contains(path) {
            return Err(EngineError::SourceControlError(format!("write {} rejected", path)));
        }
        self.writes.lock().unwrap().push(Write::Updated {
            branch: branch.to_string(),
            path: path.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }
}

enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

/// Text generator with a canned reply
pub struct StubAi {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl StubAi {
    pub fn replying(text: &str) -> Self {
        Self::with(Reply::Text(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Reply::Fail(message.to_string()))
    }

    /// Never answers within any reasonable timeout
    pub fn hanging() -> Self {
        Self::with(Reply::Hang)
    }

    fn with(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubAi {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(EngineError::GenerationError(message.clone())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

/// Command runner that records what it was asked to run
#[derive(Default)]
pub struct RecordingRunner {
    failing: HashSet<String>,
    erroring: HashSet<String>,
    pub spawned: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `command` exits non-zero
    pub fn failing(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    /// `command` cannot be started
    pub fn erroring(mut self, command: &str) -> Self {
        self.erroring.insert(command.to_string());
        self
    }

    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, _working_dir: &Path) -> Result<CommandOutput, EngineError> {
        if self.erroring.contains(command) {
            return Err(EngineError::CommandError("spawn failed".to_string()));
        }
        self.spawned.lock().unwrap().push(command.to_string());
        if self.failing.contains(command) {
            return Ok(CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: "boom\n".to_string(),
                return_code: Some(1),
            });
        }
        Ok(CommandOutput {
            success: true,
            stdout: format!("ran {}\n", command),
            stderr: String::new(),
            return_code: Some(0),
        })
    }
}

/// Root-level files of a React + FastAPI repository
pub fn fullstack_repo() -> StubRepo {
    StubRepo::new()
        .with_file(
            "package.json",
            r#"{"name": "web", "dependencies": {"react": "^18.2.0", "axios": "^1.6.0"}, "scripts": {"build": "react-scripts build"}}"#,
        )
        .with_file("requirements.txt", "fastapi==0.110.0\nuvicorn\n\npymongo==4.6\n")
        .with_file("frontend/src/App.js", "export default function App() {}")
        .with_file("frontend/package.json", "{}")
        .with_file("backend/server.py", "from fastapi import FastAPI\napp = FastAPI()\n")
        .with_file("README.md", "# app\n")
}
