//! Recursive decomposition of eligible tasks into bounded subtasks

pub mod engine;
pub mod subtasks;

pub use engine::{ExpansionEngine, ExpansionOutcome, ExpansionStatus, ProjectExpansion};
pub use subtasks::{MAX_SUBTASK_HOURS, MIN_SUBTASK_HOURS, SubtaskSpec};
