//! Tasks: the persisted model, initial synthesis and the tree arena

pub mod forest;
pub mod synthesizer;
pub mod task;

pub use forest::TaskForest;
pub use synthesizer::synthesize;
pub use task::{
    EXPANSION_HOURS_THRESHOLD, Task, TaskComplexity, TaskDraft, TaskStatus, is_expansion_eligible,
};
