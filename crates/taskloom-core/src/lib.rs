//! Taskloom Core Library
//!
//! Turns a free-form requirements document into a persisted project graph:
//! - Commands (analyze, expand, project)
//! - Domain: quality scoring, enhancement, feature extraction, stack
//!   recommendation, task synthesis and hierarchical expansion
//! - Oracle gateway over an LLM with deterministic fallbacks
//! - Storage (SQLite)
//! - LLM integration (OpenRouter API)

pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod storage;


pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::Analyzer;
    pub use crate::config::Config;
    pub use crate::domain::expansion::{ExpansionEngine, ExpansionOutcome, ExpansionStatus};
    pub use crate::domain::stack::{ConflictResolver, NonInteractive, Preset, Resolution};
    pub use crate::domain::{AnalysisResult, GraphRepository, ProjectGraph};
    pub use crate::error::{Error, Result};
    pub use crate::oracle::{Oracle, OracleGateway};
    pub use crate::storage::{Database, SqliteGraphRepository};
}
