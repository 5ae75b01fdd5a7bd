//! Core domain layer for Kiln.
//!
//! This module contains pure scaffolding logic. All filesystem, process and
//! network concerns are handled via ports (traits) defined in the
//! application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No I/O**: planning, composition and cleanup selection are pure
//! - **Data-driven**: feature modules are rows in a static table
//! - **Immutable plans**: a [`PathPlan`] is computed once and only read
//!
// Public API - what the world sees
pub mod cleanup;
pub mod entities;
pub mod error;
pub mod features;
pub mod manifest;
pub mod value_objects;

// Private implementation details - not visible outside domain
mod validation;

// Re-exports for convenience
pub use cleanup::{CleanupPolicy, PathEntry};
pub use entities::{
    GeneratedFile, ManifestPlan, PathPlan, RelativePath, RenderContext, ToolInvocation,
};
pub use error::{DomainError, ErrorCategory};
pub use features::{FeatureDef, FeatureRegistry};
pub use manifest::{Composition, ManifestComposer, ManifestEntry, requirement_name};
pub use validation::DomainValidator;
pub use value_objects::{
    DEFAULT_PYTHON_VERSION, DependencyGroup, Layout, ManifestKind, ScaffoldOptions, ScriptEntry,
    WritePolicy,
};
