//! Domain layer
//!
//! The requirements-to-task-graph pipeline: document quality, enhancement,
//! feature extraction, stack recommendation, task synthesis and expansion.
//! Everything here is pure or talks to the outside world only through the
//! [`OracleGateway`](crate::oracle::OracleGateway) and [`GraphRepository`].

pub mod analysis;
pub mod complexity;
pub mod document;
pub mod enhancer;
pub mod expansion;
pub mod features;
pub mod graph;
pub mod priority;
pub mod quality;
pub mod setup;
pub mod stack;
pub mod tasks;
pub mod text;

pub use analysis::{AnalysisResult, AnalysisStatistics};
pub use document::{Document, ProjectInfo};
pub use graph::{GraphRepository, ProjectContext, ProjectGraph, ProjectRecord, ProjectSummary};
pub use priority::Priority;
pub use quality::QualityReport;
