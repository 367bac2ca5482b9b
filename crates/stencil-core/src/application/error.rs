//! Application layer errors.
//!
//! These errors represent failures in orchestration, not generation logic.
//! Generation errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while orchestrating a generation run.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// The template tree could not be read.
    #[error("Cannot read scaffold source {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Writing the staging directory failed; nothing was committed.
    #[error("Staging failed at {path}: {reason}")]
    StagingFailed { path: PathBuf, reason: String },

    /// Moving staged files into place failed; files already moved were
    /// taken back out.
    #[error("Commit failed at {path}: {reason}")]
    CommitFailed { path: PathBuf, reason: String },

    /// The run was cancelled before commit.
    #[error("Generation cancelled; {output} was not modified")]
    Cancelled { output: PathBuf },

    /// Output exists and would be clobbered where that is not allowed.
    #[error("Output already exists at {path}")]
    OutputExists { path: PathBuf },

    /// An existing file targeted by an injection could not be read.
    #[error("Cannot read injection target {path}: {reason}")]
    InjectTargetUnreadable { path: PathBuf, reason: String },

    /// A post-scaffold hook could not be started or exited non-zero. The
    /// generated files stay in place.
    #[error("Hook {hook} failed: {reason}")]
    HookFailed { hook: String, reason: String },

    /// Rollback failed (best-effort cleanup failed).
    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } | Self::StagingFailed { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::SourceUnavailable { .. } => vec![
                "Check that the scaffold path exists and contains a templates directory".into(),
            ],
            Self::CommitFailed { path, .. } => vec![
                format!("Could not move generated files into {}", path.display()),
                "Check permissions and free space, then re-run".into(),
            ],
            Self::Cancelled { .. } => vec!["Re-run the command to generate the project".into()],
            Self::HookFailed { hook, .. } => vec![
                "The project was generated; only the hook failed".into(),
                format!("Inspect hooks/{hook} in the scaffold, or set settings.run_hooks = \"never\""),
            ],
            Self::OutputExists { path } => vec![
                format!("Directory already exists: {}", path.display()),
                "Choose a different output directory".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceUnavailable { .. } => ErrorCategory::NotFound,
            Self::OutputExists { .. } => ErrorCategory::Validation,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::FilesystemError { .. }
            | Self::StagingFailed { .. }
            | Self::CommitFailed { .. }
            | Self::InjectTargetUnreadable { .. }
            | Self::HookFailed { .. }
            | Self::RollbackFailed { .. } => ErrorCategory::Internal,
        }
    }
}
