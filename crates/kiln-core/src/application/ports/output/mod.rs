//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `kiln-adapters` crate provides implementations.

use std::path::Path;

use crate::domain::{PathEntry, ToolInvocation};
use crate::error::KilnResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `kiln_adapters::filesystem::LocalFilesystem` (production)
/// - `kiln_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> KilnResult<()>;

    /// Write content to a file, replacing whatever is there.
    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()>;

    /// Read a file; `None` if nothing exists at `path`.
    fn read_to_string(&self, path: &Path) -> KilnResult<Option<String>>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> KilnResult<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> KilnResult<()>;

    /// List everything under `root`, relative to it.
    ///
    /// Directories matched by `CleanupPolicy::is_pruned` are listed but not
    /// descended into.
    fn walk(&self, root: &Path) -> KilnResult<Vec<PathEntry>>;
}

/// Port for running external developer tools.
///
/// Implemented by:
/// - `kiln_adapters::process::ProcessRunner` (production)
/// - `kiln_adapters::process::RecordingRunner` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner: Send + Sync {
    /// Run to completion in `cwd`.
    ///
    /// Non-zero exit maps to `ApplicationError::ExternalTool`, a missing
    /// binary to `ApplicationError::ToolNotFound`, any other launch failure
    /// to `ApplicationError::FilesystemError` with the OS reason.
    fn run(&self, invocation: &ToolInvocation, cwd: &Path) -> KilnResult<()>;
}

/// Port for downloading and unpacking an application skeleton.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher: Send + Sync {
    /// Unpack the archive at `url` into the empty directory `dest`,
    /// returning entries written.
    fn fetch_into(&self, url: &str, dest: &Path) -> KilnResult<usize>;
}
