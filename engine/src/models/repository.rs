//! Repository structure and tech stack models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry in a scanned repository tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructureNode {
    /// A directory and everything beneath it
    Directory {
        contents: RepositoryStructure,

        /// Set when the listing for this directory failed and it was
        /// recorded empty instead
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        degraded: bool,
    },

    /// A regular file (symlinks and submodules are recorded as files too)
    File { size: u64, path: String },
}

impl StructureNode {
    pub fn file(size: u64, path: impl Into<String>) -> Self {
        StructureNode::File {
            size,
            path: path.into(),
        }
    }

    pub fn directory(contents: RepositoryStructure) -> Self {
        StructureNode::Directory {
            contents,
            degraded: false,
        }
    }

    /// An empty directory standing in for one whose listing failed
    pub fn degraded_directory() -> Self {
        StructureNode::Directory {
            contents: RepositoryStructure::new(),
            degraded: true,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, StructureNode::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StructureNode::File { .. })
    }

    pub fn contents(&self) -> Option<&RepositoryStructure> {
        match self {
            StructureNode::Directory { contents, .. } => Some(contents),
            StructureNode::File { .. } => None,
        }
    }
}

/// A repository tree keyed by entry name, rooted at the repository top
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryStructure {
    entries: BTreeMap<String, StructureNode>,
}

impl RepositoryStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, node: StructureNode) {
        self.entries.insert(name.into(), node);
    }

    pub fn get(&self, name: &str) -> Option<&StructureNode> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StructureNode)> {
        self.entries.iter()
    }

    /// Resolve a slash-separated path to a node
    pub fn lookup(&self, path: &str) -> Option<&StructureNode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let mut node = self.entries.get(segments.next()?)?;
        for segment in segments {
            node = node.contents()?.get(segment)?;
        }
        Some(node)
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(StructureNode::is_file)
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(StructureNode::is_directory)
    }

    /// Entry exists at `path`, whatever its kind
    pub fn has_entry(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Paths of every directory whose listing failed during the scan
    pub fn degraded_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_degraded("", &mut out);
        out
    }

    fn collect_degraded(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, node) in &self.entries {
            if let StructureNode::Directory { contents, degraded } = node {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                if *degraded {
                    out.push(path.clone());
                }
                contents.collect_degraded(&path, out);
            }
        }
    }

    /// Total number of files in the tree
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                StructureNode::File { .. } => 1,
                StructureNode::Directory { contents, .. } => contents.file_count(),
            })
            .sum()
    }
}

/// A single detector output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        Signal::Flag(value)
    }
}

impl From<String> for Signal {
    fn from(value: String) -> Self {
        Signal::Text(value)
    }
}

impl From<Vec<String>> for Signal {
    fn from(value: Vec<String>) -> Self {
        Signal::List(value)
    }
}

/// Area of the application a signal describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Frontend,
    Backend,
    Database,
    Deployment,
}

pub type SignalMap = BTreeMap<String, Signal>;

/// Detected technology stack, one open signal map per concern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStack {
    #[serde(default)]
    pub frontend: SignalMap,
    #[serde(default)]
    pub backend: SignalMap,
    #[serde(default)]
    pub database: SignalMap,
    #[serde(default)]
    pub deployment: SignalMap,
}

impl TechStack {
    pub fn signals(&self, concern: Concern) -> &SignalMap {
        match concern {
            Concern::Frontend => &self.frontend,
            Concern::Backend => &self.backend,
            Concern::Database => &self.database,
            Concern::Deployment => &self.deployment,
        }
    }

    fn signals_mut(&mut self, concern: Concern) -> &mut SignalMap {
        match concern {
            Concern::Frontend => &mut self.frontend,
            Concern::Backend => &mut self.backend,
            Concern::Database => &mut self.database,
            Concern::Deployment => &mut self.deployment,
        }
    }

    /// Record a signal. An already present key keeps its first value.
    ///
    /// Returns true when the signal was newly recorded.
    pub fn record(&mut self, concern: Concern, key: &str, signal: impl Into<Signal>) -> bool {
        let map = self.signals_mut(concern);
        if map.contains_key(key) {
            return false;
        }
        map.insert(key.to_string(), signal.into());
        true
    }

    pub fn get(&self, concern: Concern, key: &str) -> Option<&Signal> {
        self.signals(concern).get(key)
    }

    /// True only for a boolean signal set to true
    pub fn flag(&self, concern: Concern, key: &str) -> bool {
        matches!(self.get(concern, key), Some(Signal::Flag(true)))
    }
}
