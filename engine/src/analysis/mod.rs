//! Repository analysis: structure scan, stack detection and strategy choice

pub mod detector;
pub mod scanner;
pub mod strategy;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::analysis::detector::TechStackDetector;
use crate::analysis::scanner::{ScannerOptions, StructureScanner};
use crate::analysis::strategy::StrategyGenerator;
use crate::errors::EngineError;
use crate::models::deployment::RepositoryAnalysis;
use crate::services::{SourceControl, TextGenerator};
use crate::utils::now_rfc3339;

/// Runs the three analysis stages in order
pub struct RepositoryAnalyzer {
    scanner: StructureScanner,
    detector: TechStackDetector,
    generator: StrategyGenerator,
}

impl RepositoryAnalyzer {
    pub fn new(
        scm: Arc<dyn SourceControl>,
        ai: Arc<dyn TextGenerator>,
        scanner_options: ScannerOptions,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            scanner: StructureScanner::new(scm.clone(), scanner_options),
            detector: TechStackDetector::new(scm),
            generator: StrategyGenerator::new(ai, generation_timeout),
        }
    }

    /// Analyze a repository. Fails only when its root cannot be listed.
    pub async fn analyze(&self, repo: &str) -> Result<RepositoryAnalysis, EngineError> {
        info!("Analyzing repository: {}", repo);

        let structure = self
            .scanner
            .scan(repo)
            .await
            .map_err(|e| EngineError::DeployError(format!("Repository analysis failed: {}", e)))?;
        let tech_stack = self.detector.detect(repo, &structure).await;
        let resolved = self.generator.generate(&tech_stack, &structure).await;

        Ok(RepositoryAnalysis {
            repo_name: repo.to_string(),
            structure,
            tech_stack,
            deployment_strategy: resolved.strategy,
            strategy_source: resolved.source,
            strategy_fallback_reason: resolved.fallback_reason,
            analysis_timestamp: now_rfc3339(),
        })
    }
}
