//! Storage layer - SQLite
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//! - `graph`: [`GraphRepository`](crate::domain::GraphRepository) over SQLite
//!
//! # Usage
//!
//! ```ignore
//! use taskloom_core::storage::{Database, SqliteGraphRepository};
//!
//! let db = Database::in_memory().await?;
//! let repository = SqliteGraphRepository::new(db.pool().clone());
//! ```

pub mod database;
pub mod graph;
pub mod migrations;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use graph::SqliteGraphRepository;
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
