//! Error types for the configuration-to-document pipeline

use thiserror::Error;

/// Malformed template markup
///
/// Raised only for structural problems in a template string, never for
/// missing answers. A template error means the generator produced bad text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("Unexpected closing delimiter at byte {0}")]
    UnexpectedClose(usize),

    #[error("Nested placeholder opening at byte {0}")]
    Nested(usize),

    #[error("Empty placeholder at byte {0}")]
    Empty(usize),

    #[error("Invalid placeholder name '{name}' at byte {offset}")]
    InvalidName { name: String, offset: usize },

    #[error("Placeholder '{0}' is not part of the template vocabulary")]
    UnknownPlaceholder(String),
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Concurrent publishes could not converge on a single active configuration
    #[error("Configuration conflict: {0}")]
    Conflict(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// AI strategy failed or timed out; absorbed by the generator's fallback
    #[error("Narrative generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// No active configuration and bootstrap failed
    #[error("No active configuration: {0}")]
    MissingConfiguration(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the caller may retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(EngineError::Conflict("two active".into()).is_retryable());
        assert!(!EngineError::Template(TemplateError::Unclosed(3)).is_retryable());
        assert!(!EngineError::MissingConfiguration("empty".into()).is_retryable());
    }

    #[test]
    fn test_template_error_messages() {
        let err = TemplateError::InvalidName {
            name: "a b".into(),
            offset: 4,
        };
        assert_eq!(err.to_string(), "Invalid placeholder name 'a b' at byte 4");

        let wrapped: EngineError = TemplateError::Unclosed(7).into();
        assert_eq!(
            wrapped.to_string(),
            "Template error: Unclosed placeholder starting at byte 7"
        );
    }
}
