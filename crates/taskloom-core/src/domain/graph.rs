//! Project graph read models and the persistence contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::analysis::AnalysisResult;
use super::expansion::SubtaskSpec;
use super::features::Feature;
use super::setup::{PackageManager, SetupCommand};
use super::stack::TechnologyRecommendation;
use super::tasks::{Task, TaskForest, TaskStatus};

/// A persisted project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub document: String,
    pub quality_before: f64,
    pub quality_after: f64,
    pub complexity_score: f64,
    pub estimated_timeline: String,
    pub total_hours: f64,
    pub package_manager: PackageManager,
    pub created_at: DateTime<Utc>,
}

/// Everything stored for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub project: ProjectRecord,
    pub features: Vec<Feature>,
    /// Highest confidence first
    pub technologies: Vec<TechnologyRecommendation>,
    /// Priority descending, then creation order
    pub tasks: Vec<Task>,
    /// Execution order
    pub setup_commands: Vec<SetupCommand>,
    pub risks: Vec<String>,
    pub clarifications: Vec<String>,
}

impl ProjectGraph {
    pub fn forest(&self) -> TaskForest {
        TaskForest::new(self.tasks.iter().cloned())
    }
}

/// What the expansion prompt needs to know about a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub name: String,
    pub technologies: Vec<String>,
    pub complexity_score: f64,
    pub package_manager: PackageManager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub task_count: i64,
    pub total_hours: f64,
    pub created_at: DateTime<Utc>,
}

/// Transactional store for analysis results and the task tree
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Persist a whole analysis in one transaction, returning the project id
    async fn save_analysis(&self, analysis: &AnalysisResult) -> Result<i64>;

    /// `None` if the project does not exist
    async fn load_project(&self, project_id: i64) -> Result<Option<ProjectGraph>>;

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>>;

    async fn project_context(&self, project_id: i64) -> Result<Option<ProjectContext>>;

    /// Eligible tasks, priority descending then hours descending
    async fn list_expandable(&self, project_id: i64, limit: u32) -> Result<Vec<Task>>;

    /// Re-check eligibility, insert the children and flip `is_expanded`,
    /// all in one transaction. `None` when the task was no longer eligible.
    async fn persist_expansion(
        &self,
        task_id: i64,
        subtasks: &[SubtaskSpec],
    ) -> Result<Option<Vec<i64>>>;

    async fn update_task_status(&self, task_id: i64, status: TaskStatus) -> Result<Task>;

    /// Newest first
    async fn list_projects(&self, limit: u32) -> Result<Vec<ProjectSummary>>;
}
