//! Error types for Taskloom

use thiserror::Error;

/// Result type alias using Taskloom's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Taskloom error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (E001-E099)
    #[error("Document is empty. Provide a requirements document with some content.")]
    EmptyDocument,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Lookup errors (E100-E199)
    #[error("Project {0} not found. Run `taskloom projects` to see saved projects.")]
    ProjectNotFound(i64),

    #[error("Task {0} not found. Run `taskloom show <project-id>` to list its tasks.")]
    TaskNotFound(i64),

    // Oracle errors (E200-E299)
    #[error("Generation oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Generation oracle timed out after {0} seconds")]
    OracleTimeout(u64),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("LLM API error: {0}. Check your API key with `taskloom config get llm.api_key`.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    // Validation errors (E300-E399)
    #[error("Validation failed: {0}")]
    Validation(String),

    // State errors (E400-E499)
    #[error("Invalid task status transition from '{from}' to '{to}'")]
    InvalidStatusTransition { from: String, to: String },

    // Database errors (E500-E599)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // User errors (E700-E799)
    #[error("User cancelled operation")]
    UserCancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyDocument => "E001",
            Self::InvalidInput(_) => "E002",
            Self::ProjectNotFound(_) => "E100",
            Self::TaskNotFound(_) => "E101",
            Self::OracleUnavailable(_) => "E200",
            Self::OracleTimeout(_) => "E201",
            Self::MalformedResponse(_) => "E202",
            Self::LLMError(_) => "E203",
            Self::RateLimited(_) => "E204",
            Self::NetworkError(_) => "E205",
            Self::Validation(_) => "E300",
            Self::InvalidStatusTransition { .. } => "E400",
            Self::DatabaseError(_) => "E500",
            Self::ConfigError(_) => "E600",
            Self::UserCancelled => "E700",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::EmptyDocument => Some("taskloom analyze <file-with-content>".to_string()),
            Self::ProjectNotFound(_) => Some("taskloom projects".to_string()),
            Self::TaskNotFound(_) => Some("taskloom show <project-id>".to_string()),
            Self::LLMError(_) | Self::OracleUnavailable(_) => {
                Some("export TASKLOOM_API_KEY=<key>".to_string())
            }
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::ConfigError(_) => Some("taskloom config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error belongs to the oracle class.
    ///
    /// Oracle errors are always recoverable: callers switch to a
    /// deterministic generator instead of propagating them.
    pub fn is_oracle_error(&self) -> bool {
        matches!(
            self,
            Self::OracleUnavailable(_)
                | Self::OracleTimeout(_)
                | Self::MalformedResponse(_)
                | Self::LLMError(_)
                | Self::RateLimited(_)
                | Self::NetworkError(_)
        )
    }
}
