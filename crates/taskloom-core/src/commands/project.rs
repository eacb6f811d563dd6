//! Project commands
//!
//! Reading saved project graphs back, listing them, and moving tasks
//! through their status lifecycle.

use std::fmt::Write as _;

use crate::Result;
use crate::domain::tasks::{Task, TaskForest, TaskStatus};
use crate::domain::{GraphRepository, ProjectGraph, ProjectSummary};
use crate::error::Error;
use crate::storage::{Database, SqliteGraphRepository};

/// Default number of projects shown by `list`
pub const DEFAULT_LIST_LIMIT: u32 = 20;

fn repository(db: &Database) -> SqliteGraphRepository {
    SqliteGraphRepository::new(db.pool().clone())
}

/// Load a project graph, failing when the id is unknown
pub async fn show(db: &Database, project_id: i64) -> Result<ProjectGraph> {
    repository(db)
        .load_project(project_id)
        .await?
        .ok_or(Error::ProjectNotFound(project_id))
}

/// Most recent projects first
pub async fn list(db: &Database, limit: u32) -> Result<Vec<ProjectSummary>> {
    repository(db).list_projects(limit).await
}

pub async fn set_task_status(db: &Database, task_id: i64, status: &str) -> Result<Task> {
    let status = TaskStatus::parse(status).ok_or_else(|| {
        Error::InvalidInput(format!(
            "unknown task status '{status}' (expected todo, in_progress, completed or blocked)"
        ))
    })?;
    repository(db).update_task_status(task_id, status).await
}

/// Plain-text report of a project graph with the task tree indented by level
pub fn render(graph: &ProjectGraph) -> String {
    let project = &graph.project;
    let mut out = String::new();

    let _ = writeln!(out, "Project #{}: {}", project.id, project.name);
    if !project.description.is_empty() {
        let _ = writeln!(out, "{}", project.description);
    }
    let _ = writeln!(
        out,
        "Quality {:.1} -> {:.1} | Complexity {:.1}/10 | Timeline {} | {:.0}h | {}",
        project.quality_before,
        project.quality_after,
        project.complexity_score,
        project.estimated_timeline,
        project.total_hours,
        project.package_manager.as_str()
    );

    if !graph.features.is_empty() {
        let _ = writeln!(out, "\nFeatures:");
        for feature in &graph.features {
            let _ = writeln!(
                out,
                "  - {} [{}, {}]",
                feature.name,
                feature.priority,
                feature.complexity.as_str()
            );
        }
    }

    if !graph.technologies.is_empty() {
        let _ = writeln!(out, "\nStack:");
        for tech in &graph.technologies {
            let _ = writeln!(
                out,
                "  - {}: {} {} ({:.0}%)",
                tech.category,
                tech.technology,
                tech.version,
                tech.confidence * 100.0
            );
        }
    }

    if !graph.setup_commands.is_empty() {
        let _ = writeln!(out, "\nSetup:");
        for command in &graph.setup_commands {
            let _ = writeln!(out, "  {}. {}", command.execution_order, command.command);
        }
    }

    let forest = graph.forest();
    let _ = writeln!(out, "\nTasks ({}):", forest.len());
    for root in forest.roots() {
        render_task(&mut out, &forest, root, 1);
    }

    for (title, items) in [("Risks", &graph.risks), ("Open questions", &graph.clarifications)] {
        if !items.is_empty() {
            let _ = writeln!(out, "\n{title}:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
    }

    out
}

fn render_task(out: &mut String, forest: &TaskForest, task: &Task, indent: usize) {
    let marker = if task.is_expanded { "+" } else { "-" };
    let _ = writeln!(
        out,
        "{:width$}{marker} #{} {} [{}, {}h, {}, {}]",
        "",
        task.id,
        task.title,
        task.priority,
        task.estimated_hours,
        task.complexity.as_str(),
        task.status.as_str(),
        width = indent * 2
    );
    for child in forest.children(task.id) {
        render_task(out, forest, child, indent + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::analyze::Analyzer;
    use crate::commands::expand::engine_with_gateway;
    use crate::config::Config;
    use crate::domain::stack::NonInteractive;
    use crate::oracle::OracleGateway;

    const DOC: &str = "# Field Notes - Survey app\n\n## Features\n### Offline Sync System\n";

    async fn seeded() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let gateway = OracleGateway::offline();
        let (id, _) = Analyzer::new(&gateway, &NonInteractive)
            .analyze_and_save(&repository(&db), DOC)
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_show_and_list() {
        let (db, id) = seeded().await;

        let graph = show(&db, id).await.unwrap();
        assert_eq!(graph.project.name, "Field Notes");
        assert!(!graph.tasks.is_empty());

        let projects = list(&db, DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].task_count as usize, graph.tasks.len());
    }

    #[tokio::test]
    async fn test_show_missing_project() {
        let (db, _) = seeded().await;
        assert!(matches!(
            show(&db, 404).await.unwrap_err(),
            Error::ProjectNotFound(404)
        ));
    }

    #[tokio::test]
    async fn test_set_task_status() {
        let (db, id) = seeded().await;
        let task_id = show(&db, id).await.unwrap().tasks[0].id;

        let task = set_task_status(&db, task_id, "in_progress").await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let err = set_task_status(&db, task_id, "todo-ish").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = set_task_status(&db, task_id, "in_progress").await.unwrap_err();
        assert!(matches!(err, Error::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn test_render_nests_children() {
        let (db, id) = seeded().await;
        let engine = engine_with_gateway(&db, &Config::default(), OracleGateway::offline());
        engine.expand_project(id, 1).await.unwrap();

        let text = render(&show(&db, id).await.unwrap());
        assert!(text.starts_with(&format!("Project #{id}: Field Notes")));
        assert!(text.contains("\n  + #"));
        assert!(text.contains("\n    - #"));
        assert!(text.contains("Design "));
    }
}
