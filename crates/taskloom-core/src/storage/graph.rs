//! SQLite implementation of the GraphRepository
//!
//! Every multi-row write runs in one transaction. Reads never hold a
//! transaction open.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::domain::expansion::SubtaskSpec;
use crate::domain::features::{Feature, FeatureComplexity};
use crate::domain::graph::{
    GraphRepository, ProjectContext, ProjectGraph, ProjectRecord, ProjectSummary,
};
use crate::domain::setup::{CommandType, PackageManager, SetupCommand};
use crate::domain::stack::{TechCategory, TechnologyRecommendation};
use crate::domain::tasks::{EXPANSION_HOURS_THRESHOLD, Task, TaskComplexity, TaskStatus};
use crate::domain::{AnalysisResult, Priority};
use crate::error::{Error, Result};

/// Orders high > medium > low
const PRIORITY_RANK: &str =
    "CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END";

const TASK_COLUMNS: &str = "id, project_id, title, description, priority, estimated_hours, \
     complexity, category, status, parent_task_id, expansion_level, is_expanded, created_at";

#[derive(Clone)]
pub struct SqliteGraphRepository {
    pool: SqlitePool,
}

impl SqliteGraphRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn dependencies_for_project(&self, project_id: i64) -> Result<HashMap<i64, Vec<i64>>> {
        let edges: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT d.task_id, d.depends_on_task_id
            FROM task_dependencies d
            JOIN tasks t ON t.id = d.task_id
            WHERE t.project_id = ?
            ORDER BY d.task_id, d.depends_on_task_id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        for (task_id, depends_on) in edges {
            map.entry(task_id).or_default().push(depends_on);
        }
        Ok(map)
    }

    fn attach_dependencies(
        rows: Vec<TaskRow>,
        mut dependencies: HashMap<i64, Vec<i64>>,
    ) -> Result<Vec<Task>> {
        rows.into_iter()
            .map(|row| {
                let deps = dependencies.remove(&row.id).unwrap_or_default();
                row.into_task(deps)
            })
            .collect()
    }
}

#[async_trait]
impl GraphRepository for SqliteGraphRepository {
    async fn save_analysis(&self, analysis: &AnalysisResult) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let (project_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO projects (
                name, description, document, quality_before, quality_after,
                complexity_score, estimated_timeline, total_hours, package_manager, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&analysis.project.name)
        .bind(&analysis.project.description)
        .bind(&analysis.document)
        .bind(analysis.enhancement.quality_before.score)
        .bind(analysis.enhancement.quality_after.score)
        .bind(analysis.complexity.score)
        .bind(&analysis.complexity.timeline)
        .bind(analysis.total_hours())
        .bind(analysis.package_manager.as_str())
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        for (position, feature) in analysis.features.iter().enumerate() {
            let dependencies = serde_json::to_string(&feature.dependencies)
                .map_err(|e| Error::Other(format!("Failed to serialize dependencies: {}", e)))?;
            sqlx::query(
                r#"
                INSERT INTO features (
                    project_id, name, description, priority, complexity,
                    effort_points, dependencies, position
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project_id)
            .bind(&feature.name)
            .bind(&feature.description)
            .bind(feature.priority.as_str())
            .bind(feature.complexity.as_str())
            .bind(feature.effort_points as i64)
            .bind(dependencies)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        for tech in &analysis.stack.technologies {
            sqlx::query(
                r#"
                INSERT INTO technologies (project_id, category, technology, version, confidence, rationale)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project_id)
            .bind(tech.category.as_str())
            .bind(&tech.technology)
            .bind(&tech.version)
            .bind(tech.confidence)
            .bind(&tech.rationale)
            .execute(&mut *tx)
            .await?;
        }

        let mut ids: HashMap<u32, i64> = HashMap::with_capacity(analysis.tasks.len());
        for draft in &analysis.tasks {
            let (task_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO tasks (
                    project_id, title, description, priority, estimated_hours, complexity,
                    category, status, parent_task_id, expansion_level, is_expanded,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, 'todo', NULL, 0, 0, ?, ?)
                RETURNING id
                "#,
            )
            .bind(project_id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.priority.as_str())
            .bind(draft.estimated_hours)
            .bind(draft.complexity.as_str())
            .bind(&draft.category)
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await?;
            ids.insert(draft.local_id, task_id);
        }

        // Edges are written only after every id is known.
        for draft in &analysis.tasks {
            let Some(&task_id) = ids.get(&draft.local_id) else {
                continue;
            };
            for local in &draft.dependencies {
                match ids.get(local) {
                    Some(&depends_on) if depends_on != task_id => {
                        sqlx::query(
                            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_task_id) VALUES (?, ?)",
                        )
                        .bind(task_id)
                        .bind(depends_on)
                        .execute(&mut *tx)
                        .await?;
                    }
                    _ => debug!(task = %draft.title, local, "Skipping unresolved dependency"),
                }
            }
        }

        for command in &analysis.setup_commands {
            sqlx::query(
                "INSERT INTO setup_commands (project_id, command_type, command, execution_order) VALUES (?, ?, ?, ?)",
            )
            .bind(project_id)
            .bind(command.command_type.as_str())
            .bind(&command.command)
            .bind(command.execution_order as i64)
            .execute(&mut *tx)
            .await?;
        }

        for (position, risk) in analysis.risks.iter().enumerate() {
            sqlx::query("INSERT INTO risks (project_id, description, position) VALUES (?, ?, ?)")
                .bind(project_id)
                .bind(risk)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }

        for (position, question) in analysis.clarifications.iter().enumerate() {
            sqlx::query(
                "INSERT INTO clarification_questions (project_id, question, position) VALUES (?, ?, ?)",
            )
            .bind(project_id)
            .bind(question)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            project_id,
            features = analysis.features.len(),
            technologies = analysis.stack.technologies.len(),
            tasks = analysis.tasks.len(),
            "Analysis saved"
        );
        Ok(project_id)
    }

    async fn load_project(&self, project_id: i64) -> Result<Option<ProjectGraph>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, document, quality_before, quality_after,
                   complexity_score, estimated_timeline, total_hours, package_manager, created_at
            FROM projects WHERE id = ?
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let project = row.into_record()?;

        let features = sqlx::query_as::<_, FeatureRow>(
            r#"
            SELECT name, description, priority, complexity, effort_points, dependencies
            FROM features WHERE project_id = ? ORDER BY position, id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(FeatureRow::into_feature)
        .collect::<Result<Vec<_>>>()?;

        let technologies = sqlx::query_as::<_, TechnologyRow>(
            r#"
            SELECT category, technology, version, confidence, rationale
            FROM technologies WHERE project_id = ? ORDER BY confidence DESC, id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TechnologyRow::into_recommendation)
        .collect::<Result<Vec<_>>>()?;

        let task_rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? \
             ORDER BY {PRIORITY_RANK} DESC, created_at, id"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        let dependencies = self.dependencies_for_project(project_id).await?;
        let tasks = Self::attach_dependencies(task_rows, dependencies)?;

        let setup_commands = sqlx::query_as::<_, SetupCommandRow>(
            r#"
            SELECT command_type, command, execution_order
            FROM setup_commands WHERE project_id = ? ORDER BY execution_order, id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SetupCommandRow::into_command)
        .collect::<Result<Vec<_>>>()?;

        let risks: Vec<(String,)> = sqlx::query_as(
            "SELECT description FROM risks WHERE project_id = ? ORDER BY position, id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let clarifications: Vec<(String,)> = sqlx::query_as(
            "SELECT question FROM clarification_questions WHERE project_id = ? ORDER BY position, id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProjectGraph {
            project,
            features,
            technologies,
            tasks,
            setup_commands,
            risks: risks.into_iter().map(|(r,)| r).collect(),
            clarifications: clarifications.into_iter().map(|(q,)| q).collect(),
        }))
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let deps: Vec<(i64,)> = sqlx::query_as(
            "SELECT depends_on_task_id FROM task_dependencies WHERE task_id = ? ORDER BY depends_on_task_id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        row.into_task(deps.into_iter().map(|(d,)| d).collect())
            .map(Some)
    }

    async fn project_context(&self, project_id: i64) -> Result<Option<ProjectContext>> {
        let row: Option<(String, f64, String)> = sqlx::query_as(
            "SELECT name, complexity_score, package_manager FROM projects WHERE id = ?",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((name, complexity_score, package_manager)) = row else {
            return Ok(None);
        };

        let technologies: Vec<(String,)> = sqlx::query_as(
            "SELECT technology FROM technologies WHERE project_id = ? ORDER BY confidence DESC, id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProjectContext {
            name,
            technologies: technologies.into_iter().map(|(t,)| t).collect(),
            complexity_score,
            package_manager: parse_package_manager(&package_manager)?,
        }))
    }

    async fn list_expandable(&self, project_id: i64, limit: u32) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE project_id = ? AND is_expanded = 0 AND expansion_level = 0 \
               AND (estimated_hours > ? OR complexity IN ('high', 'complex')) \
             ORDER BY {PRIORITY_RANK} DESC, estimated_hours DESC, id \
             LIMIT ?"
        ))
        .bind(project_id)
        .bind(EXPANSION_HOURS_THRESHOLD)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let dependencies = self.dependencies_for_project(project_id).await?;
        Self::attach_dependencies(rows, dependencies)
    }

    async fn persist_expansion(
        &self,
        task_id: i64,
        subtasks: &[SubtaskSpec],
    ) -> Result<Option<Vec<i64>>> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // The conditional flip is the eligibility re-check.
        let flipped = sqlx::query(
            r#"
            UPDATE tasks SET is_expanded = 1, updated_at = ?
            WHERE id = ? AND is_expanded = 0 AND expansion_level = 0
              AND (estimated_hours > ? OR complexity IN ('high', 'complex'))
            "#,
        )
        .bind(&now)
        .bind(task_id)
        .bind(EXPANSION_HOURS_THRESHOLD)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let (project_id, level): (i64, i64) =
            sqlx::query_as("SELECT project_id, expansion_level FROM tasks WHERE id = ?")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await?;

        let mut ids = Vec::with_capacity(subtasks.len());
        let mut by_title: HashMap<String, i64> = HashMap::with_capacity(subtasks.len());
        for spec in subtasks {
            let (child_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO tasks (
                    project_id, title, description, priority, estimated_hours, complexity,
                    category, status, parent_task_id, expansion_level, is_expanded,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, 'todo', ?, ?, 0, ?, ?)
                RETURNING id
                "#,
            )
            .bind(project_id)
            .bind(&spec.title)
            .bind(&spec.description)
            .bind(spec.priority.as_str())
            .bind(spec.estimated_hours)
            .bind(spec.complexity.as_str())
            .bind(&spec.category)
            .bind(task_id)
            .bind(level + 1)
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(child_id);
            by_title.insert(spec.title.to_lowercase(), child_id);
        }

        for (spec, &child_id) in subtasks.iter().zip(&ids) {
            for title in &spec.depends_on {
                match by_title.get(&title.to_lowercase()) {
                    Some(&depends_on) if depends_on != child_id => {
                        sqlx::query(
                            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_task_id) VALUES (?, ?)",
                        )
                        .bind(child_id)
                        .bind(depends_on)
                        .execute(&mut *tx)
                        .await?;
                    }
                    _ => debug!(task = %spec.title, dependency = %title, "Skipping unresolved dependency"),
                }
            }
        }

        tx.commit().await?;
        Ok(Some(ids))
    }

    async fn update_task_status(&self, task_id: i64, status: TaskStatus) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> = sqlx::query_as("SELECT status FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?;
        let (current,) = current.ok_or(Error::TaskNotFound(task_id))?;
        let current = TaskStatus::parse(&current)
            .ok_or_else(|| Error::Validation(format!("Invalid task status: {}", current)))?;

        let next = current.transition(status)?;
        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(task_id, from = current.as_str(), to = next.as_str(), "Task status updated");
        self.get_task(task_id)
            .await?
            .ok_or(Error::TaskNotFound(task_id))
    }

    async fn list_projects(&self, limit: u32) -> Result<Vec<ProjectSummary>> {
        let rows: Vec<ProjectSummaryRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.total_hours, p.created_at, COUNT(t.id) AS task_count
            FROM projects p
            LEFT JOIN tasks t ON t.project_id = p.id
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProjectSummary {
                id: row.id,
                name: row.name,
                task_count: row.task_count,
                total_hours: row.total_hours,
                created_at: parse_timestamp(&row.created_at),
            })
            .collect())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_priority(value: &str) -> Result<Priority> {
    Priority::parse(value).ok_or_else(|| Error::Validation(format!("Invalid priority: {}", value)))
}

fn parse_package_manager(value: &str) -> Result<PackageManager> {
    PackageManager::parse(value)
        .ok_or_else(|| Error::Validation(format!("Invalid package manager: {}", value)))
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    description: String,
    document: String,
    quality_before: f64,
    quality_after: f64,
    complexity_score: f64,
    estimated_timeline: String,
    total_hours: f64,
    package_manager: String,
    created_at: String,
}

impl ProjectRow {
    fn into_record(self) -> Result<ProjectRecord> {
        Ok(ProjectRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            document: self.document,
            quality_before: self.quality_before,
            quality_after: self.quality_after,
            complexity_score: self.complexity_score,
            estimated_timeline: self.estimated_timeline,
            total_hours: self.total_hours,
            package_manager: parse_package_manager(&self.package_manager)?,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

#[derive(Debug, FromRow)]
struct ProjectSummaryRow {
    id: i64,
    name: String,
    total_hours: f64,
    created_at: String,
    task_count: i64,
}

#[derive(Debug, FromRow)]
struct FeatureRow {
    name: String,
    description: String,
    priority: String,
    complexity: String,
    effort_points: i64,
    dependencies: String,
}

impl FeatureRow {
    fn into_feature(self) -> Result<Feature> {
        let complexity = FeatureComplexity::parse(&self.complexity).ok_or_else(|| {
            Error::Validation(format!("Invalid feature complexity: {}", self.complexity))
        })?;
        Ok(Feature {
            name: self.name,
            description: self.description,
            priority: parse_priority(&self.priority)?,
            complexity,
            effort_points: u32::try_from(self.effort_points).unwrap_or_default(),
            dependencies: serde_json::from_str(&self.dependencies).unwrap_or_default(),
        })
    }
}

#[derive(Debug, FromRow)]
struct TechnologyRow {
    category: String,
    technology: String,
    version: String,
    confidence: f64,
    rationale: String,
}

impl TechnologyRow {
    fn into_recommendation(self) -> Result<TechnologyRecommendation> {
        let category = TechCategory::parse(&self.category).ok_or_else(|| {
            Error::Validation(format!("Invalid technology category: {}", self.category))
        })?;
        Ok(TechnologyRecommendation {
            category,
            technology: self.technology,
            version: self.version,
            confidence: self.confidence,
            rationale: self.rationale,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    project_id: i64,
    title: String,
    description: String,
    priority: String,
    estimated_hours: f64,
    complexity: String,
    category: String,
    status: String,
    parent_task_id: Option<i64>,
    expansion_level: i64,
    is_expanded: bool,
    created_at: String,
}

impl TaskRow {
    fn into_task(self, dependencies: Vec<i64>) -> Result<Task> {
        let complexity = TaskComplexity::parse(&self.complexity).ok_or_else(|| {
            Error::Validation(format!("Invalid task complexity: {}", self.complexity))
        })?;
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| Error::Validation(format!("Invalid task status: {}", self.status)))?;
        let expansion_level = u32::try_from(self.expansion_level).map_err(|_| {
            Error::Validation(format!("Invalid expansion level: {}", self.expansion_level))
        })?;

        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            priority: parse_priority(&self.priority)?,
            estimated_hours: self.estimated_hours,
            complexity,
            category: self.category,
            status,
            parent_task_id: self.parent_task_id,
            expansion_level,
            is_expanded: self.is_expanded,
            dependencies,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

#[derive(Debug, FromRow)]
struct SetupCommandRow {
    command_type: String,
    command: String,
    execution_order: i64,
}

impl SetupCommandRow {
    fn into_command(self) -> Result<SetupCommand> {
        let command_type = CommandType::parse(&self.command_type).ok_or_else(|| {
            Error::Validation(format!("Invalid command type: {}", self.command_type))
        })?;
        Ok(SetupCommand {
            command_type,
            command: self.command,
            execution_order: u32::try_from(self.execution_order).unwrap_or_default(),
        })
    }
}
