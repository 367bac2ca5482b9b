//! Unified error handling for Stencil Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{DomainError, ValidationError};

/// Root error type for Stencil Core operations.
#[derive(Debug, Error, Clone)]
pub enum StencilError {
    /// Errors from the domain layer (the scaffold or an answer is at fault).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration failures).
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl StencilError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Run: stencil config path".into(),
            ],
            Self::Internal { .. } => vec!["This appears to be a bug in Stencil".into()],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Scaffold => ErrorCategory::Scaffold,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether asking again could succeed (a rejected answer).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Domain(DomainError::Validation(_)))
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Domain(DomainError::Validation(e)) => Some(e),
            _ => None,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// An answer was rejected.
    Validation,
    /// The scaffold definition or its templates are broken.
    Scaffold,
    NotFound,
    Configuration,
    Cancelled,
    Internal,
}

/// Convenient result type alias.
pub type StencilResult<T> = Result<T, StencilError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> StencilResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> StencilResult<T> {
        self.map_err(|e| StencilError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_categories_are_mapped() {
        let err: StencilError = DomainError::Validation(ValidationError::Required {
            question: "name".into(),
        })
        .into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_retryable());
        assert_eq!(err.validation().map(|v| v.question()), Some("name"));

        let err: StencilError = DomainError::InvalidDefinition("x".into()).into();
        assert_eq!(err.category(), ErrorCategory::Scaffold);
        assert!(!err.is_retryable());
    }

    #[test]
    fn context_wraps_foreign_errors() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::other("disk on fire"));
        let err = res.context("writing file").unwrap_err();
        assert!(err.to_string().contains("writing file: disk on fire"));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }
}
