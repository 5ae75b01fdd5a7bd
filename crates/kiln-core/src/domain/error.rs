// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (carried inside pipeline failure reports)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("unknown feature '{id}'")]
    UnknownFeature { id: String, known: Vec<String> },

    #[error("feature prerequisites form a cycle: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    // ========================================================================
    // Manifest Errors
    // ========================================================================
    #[error("cannot parse {manifest} manifest: {reason}")]
    ManifestParse { manifest: String, reason: String },

    #[error("invalid config block for [{table}]: {reason}")]
    InvalidConfigBlock { table: String, reason: String },

    // ========================================================================
    // Layout Errors
    // ========================================================================
    #[error("path escapes the project root: {path}")]
    InvalidPath { path: String },

    #[error("invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("invalid python version '{version}': expected MAJOR.MINOR or MAJOR.MINOR.PATCH")]
    InvalidPythonVersion { version: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownFeature { id, known } => vec![
                format!("'{}' is not a known feature", id),
                format!("Known features: {}", known.join(", ")),
                "Try: kiln features".into(),
            ],
            Self::DependencyCycle { chain } => vec![
                format!("Cycle: {}", chain.join(" -> ")),
                "The feature catalog is malformed; please report this issue".into(),
            ],
            Self::ManifestParse { manifest, .. } => vec![
                format!("The {} manifest is not valid pyproject TOML", manifest),
                "Fix the file by hand or move it aside and re-run".into(),
                "Kiln never rewrites a manifest it cannot parse".into(),
            ],
            Self::InvalidProjectName { .. } => vec![
                "Use letters, digits, '-', '_' or '.'".into(),
                "Start and end with a letter or digit".into(),
                "Override with --name".into(),
            ],
            Self::InvalidPythonVersion { .. } => vec![
                "Pass a version such as --python 3.12".into(),
                "Or set defaults.python_version in your kiln config".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownFeature { .. }
            | Self::InvalidProjectName { .. }
            | Self::InvalidPythonVersion { .. } => ErrorCategory::Validation,
            Self::DependencyCycle { .. } | Self::InvalidConfigBlock { .. } => {
                ErrorCategory::Internal
            }
            Self::ManifestParse { .. } => ErrorCategory::Parse,
            Self::InvalidPath { .. } => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Parse,
    Internal,
}
