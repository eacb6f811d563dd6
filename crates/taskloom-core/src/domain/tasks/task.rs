//! Task records and their lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Priority;
use crate::error::{Error, Result};

/// Tasks estimated above this many hours may be decomposed
pub const EXPANSION_HOURS_THRESHOLD: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    Low,
    #[default]
    Medium,
    High,
    Complex,
}

impl TaskComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskComplexity::Low => "low",
            TaskComplexity::Medium => "medium",
            TaskComplexity::High => "high",
            TaskComplexity::Complex => "complex",
        }
    }

    /// Case-insensitive parse
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(TaskComplexity::Low),
            "medium" => Some(TaskComplexity::Medium),
            "high" => Some(TaskComplexity::High),
            "complex" => Some(TaskComplexity::Complex),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "blocked" => Some(TaskStatus::Blocked),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Todo, InProgress)
                | (Todo, Blocked)
                | (InProgress, Completed)
                | (InProgress, Blocked)
                | (Blocked, InProgress)
                | (Blocked, Todo)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(&self, next: TaskStatus) -> Result<TaskStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

/// The eligibility predicate for decomposition
pub fn is_expansion_eligible(
    expansion_level: u32,
    is_expanded: bool,
    estimated_hours: f64,
    complexity: TaskComplexity,
) -> bool {
    expansion_level == 0
        && !is_expanded
        && (estimated_hours > EXPANSION_HOURS_THRESHOLD
            || matches!(complexity, TaskComplexity::High | TaskComplexity::Complex))
}

/// A persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub complexity: TaskComplexity,
    pub category: String,
    pub status: TaskStatus,
    /// Non-owning back-reference; `None` for roots
    pub parent_task_id: Option<i64>,
    pub expansion_level: u32,
    pub is_expanded: bool,
    /// Ids of tasks this one depends on
    pub dependencies: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_expansion_eligible(&self) -> bool {
        is_expansion_eligible(
            self.expansion_level,
            self.is_expanded,
            self.estimated_hours,
            self.complexity,
        )
    }
}

/// A task produced by the synthesizer, not yet persisted.
///
/// `local_id` is unique within one analysis; `dependencies` reference
/// other drafts by local id and are remapped to real ids on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub local_id: u32,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub complexity: TaskComplexity,
    pub category: String,
    pub dependencies: Vec<u32>,
}

impl TaskDraft {
    pub fn is_expansion_eligible(&self) -> bool {
        is_expansion_eligible(0, false, self.estimated_hours, self.complexity)
    }
}
