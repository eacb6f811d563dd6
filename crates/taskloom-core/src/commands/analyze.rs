//! Document analysis pipeline
//!
//! document → enhancement → project info → features → complexity →
//! stack → package manager → setup commands → tasks. One sequential run;
//! the only suspension points are oracle calls inside enhancement.

use tracing::{debug, info};

use crate::domain::complexity;
use crate::domain::enhancer::Enhancer;
use crate::domain::features;
use crate::domain::setup::{self, PackageManager};
use crate::domain::stack::{self, ConflictResolver};
use crate::domain::tasks;
use crate::domain::{AnalysisResult, Document, GraphRepository};
use crate::error::Result;
use crate::oracle::OracleGateway;

pub struct Analyzer<'a> {
    gateway: &'a OracleGateway,
    resolver: &'a dyn ConflictResolver,
}

impl<'a> Analyzer<'a> {
    pub fn new(gateway: &'a OracleGateway, resolver: &'a dyn ConflictResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Run the pipeline. Only an empty document is fatal; oracle trouble
    /// degrades to the deterministic generators.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult> {
        let document = Document::new(text)?;
        info!(words = document.word_count(), "Analyzing document");

        let enhancement = Enhancer::new(self.gateway).enhance(&document).await;
        let working = Document::new(enhancement.enhanced.clone())?;
        debug!(
            before = enhancement.quality_before.score,
            after = enhancement.quality_after.score,
            "Quality assessed"
        );

        let project = working.project_info();
        let features = features::extract_features(working.as_str());
        info!(project = %project.name, features = features.len(), "Features extracted");

        let complexity = complexity::analyze(working.as_str(), &features);
        debug!(score = complexity.score, timeline = %complexity.timeline, "Complexity analyzed");

        let stack = stack::recommend(working.as_str(), &features, self.resolver);
        info!(
            technologies = stack.technologies.len(),
            mean_confidence = stack.mean_confidence,
            warnings = stack.warnings.len(),
            "Stack recommended"
        );

        let package_manager = PackageManager::detect(working.as_str());
        let setup_commands = setup::setup_commands(&stack.technologies, package_manager);
        let tasks = tasks::synthesize(&project.name, &features);
        info!(tasks = tasks.len(), "Tasks synthesized");

        let risks = complexity.risks.clone();
        let mut clarifications: Vec<String> = Vec::new();
        for question in enhancement
            .clarification_questions
            .iter()
            .chain(stack.clarifications.iter())
        {
            if !clarifications.contains(question) {
                clarifications.push(question.clone());
            }
        }

        Ok(AnalysisResult {
            project,
            document: working.as_str().to_string(),
            enhancement,
            features,
            stack,
            complexity,
            package_manager,
            setup_commands,
            tasks,
            risks,
            clarifications,
        })
    }

    /// Analyze and persist in one call, returning the new project id
    pub async fn analyze_and_save<R: GraphRepository + ?Sized>(
        &self,
        repository: &R,
        text: &str,
    ) -> Result<(i64, AnalysisResult)> {
        let analysis = self.analyze(text).await?;
        let project_id = repository.save_analysis(&analysis).await?;
        Ok((project_id, analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use crate::domain::stack::{NonInteractive, Preset, Resolution, TechCategory};
    use crate::error::Error;

    const SHOP: &str = "# Corner Shop - Online Store\n\n\
        ## Overview\n\
        An online shop where each user can browse products and pay with cards.\n\n\
        ## Features\n\
        ### Product Catalog Interface\n\
        ### Core Payment Service\n\
        ### Order Management System\n\n\
        - Browse products by category\n\
        - Pay securely with saved cards\n\
        - Track orders after checkout\n\n\
        Customers must be able to check out when logged in. Performance and security matter.\n\
        Built with React Router v7, Tailwind and Drizzle on PostgreSQL, with a Node.js backend. \
        We use pnpm.\n";

    #[tokio::test]
    async fn test_empty_document_is_fatal() {
        let gateway = OracleGateway::offline();
        let analyzer = Analyzer::new(&gateway, &NonInteractive);
        let err = analyzer.analyze("   \n").await.unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[tokio::test]
    async fn test_pipeline_offline() {
        let gateway = OracleGateway::offline();
        let analyzer = Analyzer::new(&gateway, &NonInteractive);
        let result = analyzer.analyze(SHOP).await.unwrap();

        assert_eq!(result.project.name, "Corner Shop");
        assert_eq!(result.features.len(), 3);
        assert_eq!(result.package_manager, PackageManager::Pnpm);
        assert!(!result.setup_commands.is_empty());
        assert_eq!(result.tasks.len(), 19 + 3 * 3);
        assert!(result.risks.contains(&"Payment integration complexity".to_string()));
        assert!(!result.enhancement.was_enhanced);
        assert_eq!(result.document, SHOP);

        // Non-interactive runs keep both sides of the conflict.
        assert!(result.stack.has_category(TechCategory::FullstackFramework));
        assert!(result.stack.has_category(TechCategory::Backend));

        let stats = result.statistics();
        assert_eq!(stats.total_tasks, result.tasks.len());
        assert_eq!(
            stats.high_priority_tasks + stats.medium_priority_tasks + stats.low_priority_tasks,
            stats.total_tasks
        );
        assert!(stats.total_hours > 0.0);
        assert!(result.tasks.iter().any(|t| t.priority == Priority::High));
    }

    #[tokio::test]
    async fn test_preset_resolution_prunes_backend() {
        let gateway = OracleGateway::offline();
        let resolver = Preset(Resolution::FullstackOnly);
        let analyzer = Analyzer::new(&gateway, &resolver);
        let result = analyzer.analyze(SHOP).await.unwrap();

        assert!(result.stack.has_category(TechCategory::FullstackFramework));
        assert!(!result.stack.has_category(TechCategory::Backend));
    }

    #[tokio::test]
    async fn test_clarifications_are_deduplicated() {
        let gateway = OracleGateway::offline();
        let analyzer = Analyzer::new(&gateway, &NonInteractive);
        let result = analyzer.analyze("user login app").await.unwrap();

        let unique: std::collections::HashSet<&String> = result.clarifications.iter().collect();
        assert_eq!(unique.len(), result.clarifications.len());
        assert!(!result.clarifications.is_empty());
    }
}
