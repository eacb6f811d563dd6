//! Database migrations
//!
//! Versioned schema changes, applied in order on connection and tracked in
//! the `_migrations` table.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: projects, features, technologies and the task tree
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        document TEXT NOT NULL,
        quality_before REAL NOT NULL DEFAULT 0,
        quality_after REAL NOT NULL DEFAULT 0,
        complexity_score REAL NOT NULL DEFAULT 0,
        estimated_timeline TEXT NOT NULL DEFAULT '',
        total_hours REAL NOT NULL DEFAULT 0,
        package_manager TEXT NOT NULL DEFAULT 'pnpm',
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS features (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
        complexity TEXT NOT NULL CHECK (complexity IN ('simple', 'medium', 'complex')),
        effort_points INTEGER NOT NULL,
        dependencies TEXT NOT NULL DEFAULT '[]',
        position INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_features_project ON features(project_id);

    CREATE TABLE IF NOT EXISTS technologies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        category TEXT NOT NULL,
        technology TEXT NOT NULL,
        version TEXT NOT NULL DEFAULT 'latest',
        confidence REAL NOT NULL CHECK (confidence >= 0 AND confidence <= 1),
        rationale TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_technologies_project ON technologies(project_id);

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
        estimated_hours REAL NOT NULL,
        complexity TEXT NOT NULL CHECK (complexity IN ('low', 'medium', 'high', 'complex')),
        category TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'todo'
            CHECK (status IN ('todo', 'in_progress', 'completed', 'blocked')),
        parent_task_id INTEGER REFERENCES tasks(id) ON DELETE CASCADE,
        expansion_level INTEGER NOT NULL DEFAULT 0 CHECK (expansion_level >= 0),
        is_expanded INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
    CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task_id);

    CREATE TABLE IF NOT EXISTS task_dependencies (
        task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        depends_on_task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        PRIMARY KEY (task_id, depends_on_task_id),
        CHECK (task_id != depends_on_task_id)
    );
"#;

/// Migration 2: write-once pipeline outputs
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS setup_commands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        command_type TEXT NOT NULL CHECK (command_type IN ('setup', 'install', 'environment')),
        command TEXT NOT NULL,
        execution_order INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_setup_commands_project ON setup_commands(project_id);

    CREATE TABLE IF NOT EXISTS risks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        description TEXT NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS clarification_questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        question TEXT NOT NULL,
        position INTEGER NOT NULL
    );
"#;

/// Get the current schema version
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Project graph schema");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Setup commands, risks and clarifications");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!(version = CURRENT_VERSION, "Database migrations complete");
    Ok(())
}

pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub target_version: i32,
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await;

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_migration);

        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
        assert!(!status.needs_migration);
        assert!(!needs_migration(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = create_test_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_tables_created() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        for table in [
            "projects",
            "features",
            "technologies",
            "tasks",
            "task_dependencies",
            "setup_commands",
            "risks",
            "clarification_questions",
        ] {
            let result: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|_| panic!("Table {} should exist", table));
            assert_eq!(result.0, 0, "Table {} should be empty", table);
        }
    }

    #[tokio::test]
    async fn test_task_constraints() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO projects (name, document, created_at) VALUES ('p', 'doc', 'now')")
            .execute(&pool)
            .await
            .unwrap();

        let bad_status = sqlx::query(
            "INSERT INTO tasks (project_id, title, priority, estimated_hours, complexity, status, \
             created_at, updated_at) VALUES (1, 't', 'high', 4, 'low', 'done', 'now', 'now')",
        )
        .execute(&pool)
        .await;
        assert!(bad_status.is_err());

        let bad_complexity = sqlx::query(
            "INSERT INTO tasks (project_id, title, priority, estimated_hours, complexity, \
             created_at, updated_at) VALUES (1, 't', 'high', 4, 'extreme', 'now', 'now')",
        )
        .execute(&pool)
        .await;
        assert!(bad_complexity.is_err());
    }
}
