//! Kiln Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Kiln
//! Python project scaffolder, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             kiln-cli (CLI)              │
//! │       (clap commands, config, UI)       │
//! └──────────────────┬──────────────────────┘
//!                    │ routes Command → Pipeline
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Application Services           │
//! │  (CommandRouter, Engine, FileWriter)    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │       Application Ports (Traits)        │
//! │ (Filesystem, ToolRunner, ArchiveFetcher)│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     kiln-adapters (Infrastructure)      │
//! │ (LocalFilesystem, ProcessRunner, HTTP)  │
//! └─────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │ (FeatureRegistry, PathPlan, Manifest-   │
//! │  Composer, CleanupPolicy)               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kiln_core::prelude::*;
//!
//! let router = CommandRouter::new(FeatureRegistry::builtin(), RouterConfig::default());
//! let pipeline = router.route(
//!     &Command::Add { features: vec!["llm".into()] },
//!     &ScaffoldOptions::new("my-project"),
//! )?;
//!
//! // Engine with injected adapters
//! let engine = Engine::new(filesystem, runner, fetcher);
//! let report = engine.execute("./my-project".as_ref(), &pipeline)?;
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        CatalogService, Command, CommandReport, CommandRouter, Engine, FeatureInfo, Pipeline,
        RouterConfig, SideEffect, Stage,
        ports::{ArchiveFetcher, Filesystem, ToolRunner},
    };
    pub use crate::domain::{
        FeatureRegistry, Layout, ManifestKind, PathPlan, ScaffoldOptions, ScriptEntry,
        ToolInvocation,
    };
    pub use crate::error::{KilnError, KilnResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
