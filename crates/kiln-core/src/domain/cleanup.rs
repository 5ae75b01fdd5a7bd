//! Which paths `clean` and `remove-all` delete.
//!
//! Pure selection over a listing of the project tree; the application layer
//! does the walking and the deleting.

use std::collections::BTreeSet;

use crate::domain::{
    entities::{common::RelativePath, path_plan::PathPlan},
    error::DomainError,
    features::FeatureRegistry,
    value_objects::ScaffoldOptions,
};

/// Ephemeral artifacts recognised only directly under the root.
pub const ROOT_ARTIFACTS: &[&str] = &[
    ".venv",
    ".pytest_cache",
    ".ruff_cache",
    ".mypy_cache",
    "htmlcov",
    ".coverage",
    "coverage.xml",
    "build",
    "dist",
];

/// Ephemeral directories recognised at any depth.
pub const NESTED_ARTIFACT_DIRS: &[&str] = &[
    "__pycache__",
    ".ipynb_checkpoints",
    ".pytest_cache",
    ".ruff_cache",
    ".mypy_cache",
];

/// Lock and manifest files that `remove-all` deletes alongside generated trees.
pub const REMOVABLE_ROOT_FILES: &[&str] = &["pyproject.toml", "uv.lock", ".python-version"];

/// Directories never descended into while listing.
pub const OPAQUE_DIRS: &[&str] = &[".git"];

/// One listed path under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub path: RelativePath,
    pub is_dir: bool,
}

impl PathEntry {
    pub fn new(path: RelativePath, is_dir: bool) -> Self {
        Self { path, is_dir }
    }
}

pub struct CleanupPolicy;

impl CleanupPolicy {
    /// `true` if `path` is a build, cache or environment artifact.
    pub fn is_ephemeral(path: &RelativePath, is_dir: bool) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if path.depth() == 1 && ROOT_ARTIFACTS.contains(&name) {
            return true;
        }
        if is_dir {
            NESTED_ARTIFACT_DIRS.contains(&name) || name.ends_with(".egg-info")
        } else {
            name.ends_with(".pyc") || name.ends_with(".pyo")
        }
    }

    /// `true` if a listing should not descend into this directory.
    pub fn is_pruned(path: &RelativePath) -> bool {
        Self::is_ephemeral(path, true) || path.file_name().is_some_and(|n| OPAQUE_DIRS.contains(&n))
    }

    /// The ephemeral subset of `entries`, outermost only, sorted.
    pub fn select(entries: &[PathEntry]) -> Vec<PathEntry> {
        let candidates: Vec<&PathEntry> = entries
            .iter()
            .filter(|e| Self::is_ephemeral(&e.path, e.is_dir))
            .collect();
        collapse(candidates)
    }

    /// Everything `remove-all` deletes: the ephemeral set, every top-level
    /// entry any feature generates, and the lock/manifest files.
    ///
    /// User-owned root files (`.env`, `.gitignore`, `README.md`) are never
    /// included.
    pub fn removal_targets(
        entries: &[PathEntry],
        registry: &FeatureRegistry,
        options: &ScaffoldOptions,
    ) -> Result<Vec<PathEntry>, DomainError> {
        let everything = PathPlan::compute("", registry, &registry.ids(), options)?;
        let generated_dirs: BTreeSet<RelativePath> = everything
            .top_level()
            .into_iter()
            .filter(|p| everything.has_directory(&p.to_string()))
            .collect();
        let root_files: BTreeSet<RelativePath> = REMOVABLE_ROOT_FILES
            .iter()
            .map(|p| RelativePath::try_new(*p))
            .collect::<Result<_, _>>()?;

        let candidates: Vec<&PathEntry> = entries
            .iter()
            .filter(|e| {
                Self::is_ephemeral(&e.path, e.is_dir)
                    || (e.is_dir && generated_dirs.contains(&e.path))
                    || (!e.is_dir && root_files.contains(&e.path))
            })
            .collect();
        Ok(collapse(candidates))
    }
}

/// Sort and drop entries already covered by a selected ancestor directory.
fn collapse(mut candidates: Vec<&PathEntry>) -> Vec<PathEntry> {
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    let mut selected: Vec<PathEntry> = Vec::new();
    for entry in candidates {
        let covered = selected
            .iter()
            .any(|s| s.is_dir && entry.path.is_within(&s.path));
        if !covered {
            selected.push(entry.clone());
        }
    }
    selected
}
