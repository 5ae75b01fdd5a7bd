//! Application layer errors.
//!
//! These errors represent failures in orchestration and I/O, not in
//! planning logic. Planning errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::application::services::SideEffect;
use crate::error::{ErrorCategory, KilnError};

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// The project root does not exist or is not a directory.
    #[error("Project root does not exist: {path}")]
    RootMissing { path: PathBuf },

    /// An external tool exited unsuccessfully (`None` when killed by a signal).
    #[error("{tool} failed{}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    ExternalTool { tool: String, code: Option<i32> },

    /// An external tool could not be located or spawned.
    #[error("{tool} not found on PATH")]
    ToolNotFound { tool: String },

    /// A remote archive could not be downloaded or unpacked.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// In-memory adapter state is unusable (lock poisoned).
    #[error("Adapter state lock poisoned")]
    LockPoisoned,

    /// A pipeline stage failed after earlier effects had already been applied.
    #[error("Stage '{stage}' failed after {} completed step(s): {cause}", .completed.len())]
    StepFailed {
        stage: String,
        completed: Vec<SideEffect>,
        cause: Box<KilnError>,
    },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::RootMissing { path } => vec![
                format!("Create it first: mkdir -p {}", path.display()),
                "Or point kiln elsewhere with --root".into(),
            ],
            Self::ExternalTool { tool, .. } => vec![
                format!("{tool} reported a failure; its output is shown above"),
                "Re-run with --no-install to skip package-manager steps".into(),
            ],
            Self::ToolNotFound { tool } => vec![
                format!("Install {tool} and make sure it is on PATH"),
                "Or set tools.package_manager in the kiln config".into(),
            ],
            Self::FetchFailed { .. } => vec![
                "Check your network connection".into(),
                "Override the archive with tools.fastapi_archive_url".into(),
            ],
            Self::LockPoisoned => vec!["Try again in a moment".into()],
            Self::StepFailed { cause, .. } => cause.suggestions(),
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilesystemError { .. } | Self::LockPoisoned => ErrorCategory::Internal,
            Self::RootMissing { .. } | Self::ToolNotFound { .. } => ErrorCategory::NotFound,
            Self::ExternalTool { .. } | Self::FetchFailed { .. } => ErrorCategory::ExternalTool,
            Self::StepFailed { cause, .. } => cause.category(),
        }
    }

    /// Whether retrying the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockPoisoned | Self::FetchFailed { .. } => true,
            Self::StepFailed { cause, .. } => cause.is_retryable(),
            _ => false,
        }
    }
}
