//! Commands module - all operations as library functions
//!
//! These are the entry points the CLI drives.

pub mod analyze;
pub mod expand;
pub mod project;

pub use analyze::Analyzer;
