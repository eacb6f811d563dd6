//! Task expansion commands
//!
//! Thin wrappers that wire the [`ExpansionEngine`] to the SQLite graph and
//! the configured oracle.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::config::Config;
use crate::domain::expansion::{ExpansionEngine, ExpansionOutcome, ProjectExpansion};
use crate::oracle::OracleGateway;
use crate::storage::{Database, SqliteGraphRepository};

/// Engine over `db` using the configured oracle and subtask bounds
pub fn engine(
    db: &Database,
    config: &Config,
) -> Result<ExpansionEngine<SqliteGraphRepository>> {
    let gateway = OracleGateway::from_config(config)?;
    Ok(engine_with_gateway(db, config, gateway))
}

pub fn engine_with_gateway(
    db: &Database,
    config: &Config,
    gateway: OracleGateway,
) -> ExpansionEngine<SqliteGraphRepository> {
    let repository = Arc::new(SqliteGraphRepository::new(db.pool().clone()));
    ExpansionEngine::new(repository, gateway).with_config(&config.expansion)
}

pub async fn expand_task(db: &Database, config: &Config, task_id: i64) -> Result<ExpansionOutcome> {
    Ok(engine(db, config)?.expand_task(task_id).await)
}

/// Expand a project's eligible tasks. `max_tasks` falls back to
/// `expansion.max_tasks` from the configuration.
pub async fn expand_project(
    db: &Database,
    config: &Config,
    project_id: i64,
    max_tasks: Option<u32>,
    cancel: &CancellationToken,
) -> Result<ProjectExpansion> {
    let limit = max_tasks.unwrap_or_else(|| config_limit(config));
    engine(db, config)?
        .expand_project_with_cancel(project_id, limit, cancel)
        .await
}

fn config_limit(config: &Config) -> u32 {
    u32::try_from(config.expansion.max_tasks).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::analyze::Analyzer;
    use crate::domain::expansion::ExpansionStatus;
    use crate::domain::stack::NonInteractive;
    use crate::error::Error;

    const DOC: &str = "# Ledger\n\n## Features\n### Payment Processing Service\n### Reporting Dashboard\n";

    async fn seeded() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let repository = SqliteGraphRepository::new(db.pool().clone());
        let gateway = OracleGateway::offline();
        let (project_id, _) = Analyzer::new(&gateway, &NonInteractive)
            .analyze_and_save(&repository, DOC)
            .await
            .unwrap();
        (db, project_id)
    }

    #[tokio::test]
    async fn test_expand_project_uses_offline_fallback() {
        let (db, project_id) = seeded().await;
        let config = Config::default();
        let engine = engine_with_gateway(&db, &config, OracleGateway::offline());

        let result = engine.expand_project(project_id, 2).await.unwrap();
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.tasks_expanded, 2);
        for outcome in &result.results {
            assert_eq!(outcome.status, ExpansionStatus::Success);
            assert!(outcome.used_fallback);
            assert_eq!(outcome.subtasks_created, 4);
        }
    }

    #[tokio::test]
    async fn test_expand_unknown_project() {
        let (db, _) = seeded().await;
        let engine = engine_with_gateway(&db, &Config::default(), OracleGateway::offline());

        let err = engine.expand_project(999, 3).await.unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(999)));
    }

    #[test]
    fn test_config_limit() {
        let mut config = Config::default();
        config.expansion.max_tasks = 7;
        assert_eq!(config_limit(&config), 7);
    }
}
