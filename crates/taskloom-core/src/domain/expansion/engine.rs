//! Task expansion engine
//!
//! Generation happens outside any transaction. The eligibility re-check,
//! child inserts and the parent's `is_expanded` flip are one transaction
//! inside the repository, so concurrent callers expand a task at most once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExpansionConfig;
use crate::domain::graph::GraphRepository;
use crate::domain::tasks::Task;
use crate::error::{Error, Result};
use crate::oracle::OracleGateway;

use super::subtasks::{self, SUBTASK_SCHEMA, SubtaskSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionStatus {
    Success,
    Skipped,
    Error,
}

impl ExpansionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionStatus::Success => "success",
            ExpansionStatus::Skipped => "skipped",
            ExpansionStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionOutcome {
    pub status: ExpansionStatus,
    pub task_id: i64,
    pub subtasks_created: usize,
    pub subtask_ids: Vec<i64>,
    pub message: Option<String>,
    /// Children came from the fixed fallback rather than the oracle
    pub used_fallback: bool,
}

impl ExpansionOutcome {
    fn skipped(task_id: i64, message: impl Into<String>) -> Self {
        Self {
            status: ExpansionStatus::Skipped,
            task_id,
            subtasks_created: 0,
            subtask_ids: Vec::new(),
            message: Some(message.into()),
            used_fallback: false,
        }
    }

    fn error(task_id: i64, error: &Error) -> Self {
        Self {
            status: ExpansionStatus::Error,
            task_id,
            subtasks_created: 0,
            subtask_ids: Vec::new(),
            message: Some(error.to_string()),
            used_fallback: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExpansionStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectExpansion {
    pub project_id: i64,
    pub tasks_expanded: usize,
    pub results: Vec<ExpansionOutcome>,
    /// Stopped early by a cancellation request
    pub cancelled: bool,
}

pub struct ExpansionEngine<R: GraphRepository> {
    repository: Arc<R>,
    gateway: OracleGateway,
    min_subtasks: usize,
    max_subtasks: usize,
}

impl<R: GraphRepository> ExpansionEngine<R> {
    pub fn new(repository: Arc<R>, gateway: OracleGateway) -> Self {
        let defaults = ExpansionConfig::default();
        Self {
            repository,
            gateway,
            min_subtasks: defaults.min_subtasks,
            max_subtasks: defaults.max_subtasks,
        }
    }

    pub fn with_config(mut self, config: &ExpansionConfig) -> Self {
        self.min_subtasks = config.min_subtasks;
        self.max_subtasks = config.max_subtasks.max(config.min_subtasks);
        self
    }

    /// Expand one task. Failures are reported in the outcome, never raised.
    pub async fn expand_task(&self, task_id: i64) -> ExpansionOutcome {
        match self.try_expand(task_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(task_id, error = %e, "Task expansion failed");
                ExpansionOutcome::error(task_id, &e)
            }
        }
    }

    async fn try_expand(&self, task_id: i64) -> Result<ExpansionOutcome> {
        let task = self
            .repository
            .get_task(task_id)
            .await?
            .ok_or(Error::TaskNotFound(task_id))?;

        if !task.is_expansion_eligible() {
            debug!(task_id, "Task not eligible for expansion");
            return Ok(ExpansionOutcome::skipped(
                task_id,
                "Task does not need expansion",
            ));
        }

        let (subtasks, used_fallback) = self.generate(&task).await?;

        match self
            .repository
            .persist_expansion(task_id, &subtasks)
            .await?
        {
            Some(ids) => {
                info!(
                    task_id,
                    subtasks = ids.len(),
                    used_fallback,
                    "Task expanded"
                );
                Ok(ExpansionOutcome {
                    status: ExpansionStatus::Success,
                    task_id,
                    subtasks_created: ids.len(),
                    subtask_ids: ids,
                    message: None,
                    used_fallback,
                })
            }
            None => {
                debug!(task_id, "Task was expanded concurrently");
                Ok(ExpansionOutcome::skipped(task_id, "Task already expanded"))
            }
        }
    }

    /// Children for `task`, from the oracle or the fixed fallback
    async fn generate(&self, task: &Task) -> Result<(Vec<SubtaskSpec>, bool)> {
        let project = self.repository.project_context(task.project_id).await?;
        let context = subtasks::build_context(task, project.as_ref());
        let prompt = subtasks::build_prompt(&context, self.min_subtasks, self.max_subtasks);

        let generated = match self
            .gateway
            .request::<Vec<Value>>("subtasks", &prompt, SUBTASK_SCHEMA)
            .await
        {
            Ok(items) => {
                subtasks::validate_items(&items, task, self.min_subtasks, self.max_subtasks)
            }
            Err(e) => {
                debug!(task_id = task.id, error = %e, "Subtask oracle unavailable");
                None
            }
        };

        Ok(match generated {
            Some(specs) => (specs, false),
            None => {
                info!(task_id = task.id, "Using fallback subtasks");
                (subtasks::fallback(task), true)
            }
        })
    }

    pub async fn expand_project(
        &self,
        project_id: i64,
        max_tasks: u32,
    ) -> Result<ProjectExpansion> {
        self.expand_project_with_cancel(project_id, max_tasks, &CancellationToken::new())
            .await
    }

    /// Expand up to `max_tasks` eligible tasks one at a time, checking
    /// `cancel` between tasks. A failed task does not stop the batch.
    pub async fn expand_project_with_cancel(
        &self,
        project_id: i64,
        max_tasks: u32,
        cancel: &CancellationToken,
    ) -> Result<ProjectExpansion> {
        if self.repository.project_context(project_id).await?.is_none() {
            return Err(Error::ProjectNotFound(project_id));
        }

        let candidates = self
            .repository
            .list_expandable(project_id, max_tasks)
            .await?;
        info!(project_id, candidates = candidates.len(), max_tasks, "Expanding project");

        let mut results = Vec::with_capacity(candidates.len());
        let mut cancelled = false;
        for task in candidates.iter().take(max_tasks as usize) {
            if cancel.is_cancelled() {
                info!(project_id, done = results.len(), "Project expansion cancelled");
                cancelled = true;
                break;
            }
            results.push(self.expand_task(task.id).await);
        }

        let tasks_expanded = results.iter().filter(|r| r.is_success()).count();
        info!(project_id, tasks_expanded, "Project expansion finished");

        Ok(ProjectExpansion {
            project_id,
            tasks_expanded,
            results,
            cancelled,
        })
    }
}
