//! Deployment strategy generation

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::EngineError;
use crate::models::repository::{RepositoryStructure, TechStack};
use crate::models::strategy::{DeploymentStrategy, ResolvedStrategy};
use crate::services::TextGenerator;
use crate::utils::extract_json_object;

const RESPONSE_SHAPE: &str = r#"{
    "frontend": {
        "platform": "vercel",
        "build_command": "...",
        "output_directory": "...",
        "environment_variables": ["NAME", ...],
        "vercel_config": {...}
    },
    "backend": {
        "platform": "render",
        "build_command": "...",
        "start_command": "...",
        "environment_variables": ["NAME", ...],
        "dockerfile": null,
        "render_config": {...}
    },
    "database": {
        "platform": "mongodb_atlas",
        "connection_string_format": "...",
        "collections": [...]
    },
    "cicd": {
        "platform": "github_actions",
        "github_actions": {...},
        "deployment_workflow": [...]
    }
}"#;

/// Asks the text model for a deployment strategy, falling back to
/// [`DeploymentStrategy::default`] whenever the answer is unusable
pub struct StrategyGenerator {
    ai: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl StrategyGenerator {
    pub fn new(ai: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { ai, timeout }
    }

    /// Produce a strategy. Never fails.
    pub async fn generate(&self, stack: &TechStack, structure: &RepositoryStructure) -> ResolvedStrategy {
        let prompt = build_strategy_prompt(stack, structure);

        let response = match tokio::time::timeout(self.timeout, self.ai.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Strategy generation failed, using default: {}", e);
                return ResolvedStrategy::fallback(format!("generation failed: {}", e));
            }
            Err(_) => {
                warn!("Strategy generation timed out after {:?}, using default", self.timeout);
                return ResolvedStrategy::fallback(format!(
                    "generation timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        match parse_strategy(&response) {
            Ok(strategy) => {
                info!(
                    "Using generated strategy (frontend: {}, backend: {})",
                    strategy.frontend.platform, strategy.backend.platform
                );
                ResolvedStrategy::from_ai(strategy)
            }
            Err(e) => {
                warn!("Discarding generated strategy, using default: {}", e);
                ResolvedStrategy::fallback(e.to_string())
            }
        }
    }
}

/// Parse and validate a strategy embedded in free text
pub fn parse_strategy(text: &str) -> Result<DeploymentStrategy, EngineError> {
    let json = extract_json_object(text).ok_or_else(|| {
        EngineError::ValidationError("response contains no JSON object".to_string())
    })?;
    let strategy: DeploymentStrategy = serde_json::from_str(json)?;
    strategy.validate()?;
    Ok(strategy)
}

/// The prompt sent to the text model
pub fn build_strategy_prompt(stack: &TechStack, structure: &RepositoryStructure) -> String {
    let stack_json = serde_json::to_string_pretty(stack).unwrap_or_else(|_| "{}".to_string());
    let structure_json =
        serde_json::to_string_pretty(structure).unwrap_or_else(|_| "{}".to_string());

    format!(
        "Analyze this application structure and tech stack to generate an optimal deployment strategy:\n\
         \n\
         Tech Stack: {stack_json}\n\
         Structure: {structure_json}\n\
         \n\
         Generate a deployment strategy for:\n\
         1. Frontend deployment to Vercel\n\
         2. Backend deployment to Render\n\
         3. Database setup with MongoDB Atlas\n\
         4. GitHub Actions CI/CD\n\
         \n\
         Provide specific configuration and deployment commands needed.\n\
         Focus on automation and zero manual intervention.\n\
         List environment variable names only, never their values.\n\
         \n\
         Return only a JSON object with exactly this structure:\n\
         {RESPONSE_SHAPE}\n"
    )
}
