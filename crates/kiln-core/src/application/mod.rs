//! Application layer for Kiln.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (Engine, CommandRouter, FileWriter)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! planning logic itself. All planning rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    CatalogService, Command, CommandReport, CommandRouter, Engine, FeatureInfo, FileWriter,
    Pipeline, RouterConfig, SideEffect, Stage,
};

// Re-export port traits (for adapter implementation)
pub use ports::{ArchiveFetcher, Filesystem, ToolRunner};

pub use error::ApplicationError;
