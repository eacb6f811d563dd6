//! The result of one pipeline run over a document

use serde::{Deserialize, Serialize};

use super::Priority;
use super::complexity::ComplexityAnalysis;
use super::document::ProjectInfo;
use super::enhancer::EnhancementResult;
use super::features::Feature;
use super::setup::{PackageManager, SetupCommand};
use super::stack::StackRecommendation;
use super::tasks::TaskDraft;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub project: ProjectInfo,
    /// The document every stage after enhancement worked from
    pub document: String,
    pub enhancement: EnhancementResult,
    pub features: Vec<Feature>,
    pub stack: StackRecommendation,
    pub complexity: ComplexityAnalysis,
    pub package_manager: PackageManager,
    pub setup_commands: Vec<SetupCommand>,
    pub tasks: Vec<TaskDraft>,
    pub risks: Vec<String>,
    pub clarifications: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_features: usize,
    pub total_tasks: usize,
    pub total_hours: f64,
    pub high_priority_tasks: usize,
    pub medium_priority_tasks: usize,
    pub low_priority_tasks: usize,
}

impl AnalysisResult {
    pub fn total_hours(&self) -> f64 {
        self.tasks.iter().map(|t| t.estimated_hours).sum()
    }

    pub fn statistics(&self) -> AnalysisStatistics {
        let count = |p: Priority| self.tasks.iter().filter(|t| t.priority == p).count();
        AnalysisStatistics {
            total_features: self.features.len(),
            total_tasks: self.tasks.len(),
            total_hours: self.total_hours(),
            high_priority_tasks: count(Priority::High),
            medium_priority_tasks: count(Priority::Medium),
            low_priority_tasks: count(Priority::Low),
        }
    }
}
