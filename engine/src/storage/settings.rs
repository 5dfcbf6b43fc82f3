//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::scanner::ScannerOptions;
use crate::errors::EngineError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Source-control host configuration
    #[serde(default)]
    pub github: GitHubSettings,

    /// Text-generation model configuration
    #[serde(default)]
    pub gemini: GeminiSettings,

    /// Repository scan limits
    #[serde(default)]
    pub scanner: ScannerSettings,

    /// Command execution
    #[serde(default)]
    pub commands: CommandSettings,
}

impl Settings {
    /// Read the settings file, writing the defaults first if it is missing
    pub async fn load_or_init(file: &File) -> Result<Self, EngineError> {
        if file.exists().await {
            return file.read_json().await;
        }

        let settings = Self::default();
        file.write_json(&settings).await?;
        info!("Wrote default settings to {}", file.path().display());
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            github: GitHubSettings::default(),
            gemini: GeminiSettings::default(),
            scanner: ScannerSettings::default(),
            commands: CommandSettings::default(),
        }
    }
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// Base URL for the REST API
    #[serde(default = "default_github_url")]
    pub base_url: String,

    /// Branch to fork deployment branches from when the repository
    /// metadata cannot be read
    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            base_url: default_github_url(),
            default_branch: default_branch(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl GitHubSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generative Language API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Upper bound for one generation call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GeminiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Structure scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Concurrent directory listings
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_max_depth() -> usize {
    16
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_depth: default_max_depth(),
        }
    }
}

impl From<&ScannerSettings> for ScannerOptions {
    fn from(settings: &ScannerSettings) -> Self {
        ScannerOptions {
            max_concurrency: settings.max_concurrency.max(1),
            max_depth: settings.max_depth,
        }
    }
}

/// Command execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSettings {
    /// Directory commands run in unless one is given explicitly
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Per-command time limit
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_command_timeout() -> u64 {
    300
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            timeout_secs: default_command_timeout(),
        }
    }
}

impl CommandSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
