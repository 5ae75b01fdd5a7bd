//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `kiln-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations and tree listing
//!   - `ToolRunner`: External tool execution
//!   - `ArchiveFetcher`: Skeleton download and extraction

pub mod output;

pub use output::{ArchiveFetcher, Filesystem, ToolRunner};

#[cfg(test)]
pub use output::{MockArchiveFetcher, MockFilesystem, MockToolRunner};
