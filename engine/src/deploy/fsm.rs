//! Finite state machine for one orchestration run

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Log created, nothing attempted yet
    Started,

    /// Scanning, detecting and choosing a strategy
    RepositoryAnalysis,

    /// Rendering deployment files
    FilesGeneration,

    /// Creating the branch and writing files to it
    BranchCreation,

    /// Every step finished
    Completed,

    /// A step failed; later steps were not attempted
    Failed,
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    BeginAnalysis,
    BeginGeneration,
    BeginPublication,
    Finish,
    Fail(String),
}

/// Run FSM
#[derive(Debug, Clone)]
pub struct RunFsm {
    state: RunState,
    error: Option<String>,
}

impl RunFsm {
    /// Create a new FSM in started state
    pub fn new() -> Self {
        Self {
            state: RunState::Started,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<(), EngineError> {
        let new_state = match (&self.state, &event) {
            (RunState::Started, RunEvent::BeginAnalysis) => RunState::RepositoryAnalysis,
            (RunState::RepositoryAnalysis, RunEvent::BeginGeneration) => RunState::FilesGeneration,
            (RunState::FilesGeneration, RunEvent::BeginPublication) => RunState::BranchCreation,
            (RunState::BranchCreation, RunEvent::Finish) => RunState::Completed,

            // Any live state can fail
            (state, RunEvent::Fail(err)) if *state != RunState::Completed && *state != RunState::Failed => {
                self.error = Some(err.clone());
                RunState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(EngineError::DeployError(format!(
                    "Invalid transition: {:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RunFsm {
    fn default() -> Self {
        Self::new()
    }
}
