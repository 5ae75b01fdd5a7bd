//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "add a feature" or "clean the tree".

pub mod catalog;
pub mod file_writer;
pub mod pipeline;
pub mod router;

pub use catalog::{CatalogService, FeatureInfo};
pub use file_writer::FileWriter;
pub use pipeline::{CommandReport, Engine, Pipeline, SideEffect, Stage};
pub use router::{Command, CommandRouter, DEFAULT_WEB_APP_ARCHIVE, RouterConfig};
