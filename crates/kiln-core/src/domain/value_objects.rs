//! Value objects for the scaffolding domain.
//!
//! Small, copyable enums and the [`ScaffoldOptions`] record that every
//! content template is rendered against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// How a generated file is written on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    /// Written only if nothing occupies the path (protects user edits).
    CreateIfAbsent,
    /// Regenerated unconditionally.
    AlwaysOverwrite,
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateIfAbsent => write!(f, "create-if-absent"),
            Self::AlwaysOverwrite => write!(f, "always-overwrite"),
        }
    }
}

/// Package layout depth under `src/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `src/` is itself the package (`src/__init__.py`, `src/main.py`).
    Flat,
    /// The package lives in `src/<project_name_snake>/`.
    #[default]
    Nested,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "nested" => Ok(Self::Nested),
            other => Err(format!("unknown layout '{other}' (expected flat|nested)")),
        }
    }
}

/// Which manifest(s) receive the `[project.scripts]` entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEntry {
    #[default]
    Package,
    Tooling,
    Both,
    None,
}

impl ScriptEntry {
    pub fn includes(self, kind: ManifestKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _)
                | (Self::Package, ManifestKind::Package)
                | (Self::Tooling, ManifestKind::Tooling)
        )
    }
}

impl fmt::Display for ScriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Tooling => write!(f, "tooling"),
            Self::Both => write!(f, "both"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for ScriptEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "package" => Ok(Self::Package),
            "tooling" => Ok(Self::Tooling),
            "both" => Ok(Self::Both),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown script entry '{other}' (expected package|tooling|both|none)"
            )),
        }
    }
}

/// The two manifest tiers kiln composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// Root `pyproject.toml`: dev tooling, lint/test config, resolved deps.
    Tooling,
    /// `src/pyproject.toml`: runtime deps and build backend.
    Package,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 2] = [ManifestKind::Tooling, ManifestKind::Package];

    /// Path of this manifest relative to the project root.
    pub fn relative_path(self) -> &'static str {
        match self {
            Self::Tooling => "pyproject.toml",
            Self::Package => "src/pyproject.toml",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tooling => write!(f, "tooling"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Dependency group a requirement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyGroup {
    /// `[project].dependencies`
    Runtime,
    /// `[dependency-groups].dev`
    Dev,
}

/// Parameters bound into every path and content template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldOptions {
    pub project_name: String,
    pub python_version: String,
    pub layout: Layout,
    pub script_entry: ScriptEntry,
    pub editable_install: bool,
}

pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

impl ScaffoldOptions {
    /// Options with defaults for everything but the project name.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            python_version: DEFAULT_PYTHON_VERSION.into(),
            layout: Layout::default(),
            script_entry: ScriptEntry::default(),
            editable_install: false,
        }
    }

    /// Interpreter tag for tools that want `py312`; a patch level is ignored.
    pub fn python_tag(&self) -> String {
        let minor: Vec<&str> = self.python_version.split('.').take(2).collect();
        format!("py{}", minor.concat())
    }

    pub fn with_python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = version.into();
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_script_entry(mut self, entry: ScriptEntry) -> Self {
        self.script_entry = entry;
        self
    }

    pub fn with_editable_install(mut self, editable: bool) -> Self {
        self.editable_install = editable;
        self
    }

    /// Reject names that cannot become a Python distribution name and
    /// malformed interpreter versions.
    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.project_name.as_str();
        let invalid = |reason: &str| DomainError::InvalidProjectName {
            name: name.into(),
            reason: reason.into(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_', '.' allowed"));
        }
        let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
            return Err(invalid("must start and end with a letter or digit"));
        }
        validate_python_version(&self.python_version)?;
        Ok(())
    }
}

/// Accepts `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`, digits only.
fn validate_python_version(version: &str) -> Result<(), DomainError> {
    let parts: Vec<&str> = version.split('.').collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !numeric || !(2..=3).contains(&parts.len()) {
        return Err(DomainError::InvalidPythonVersion {
            version: version.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_parses_case_insensitively() {
        assert_eq!("FLAT".parse::<Layout>().unwrap(), Layout::Flat);
        assert_eq!("nested".parse::<Layout>().unwrap(), Layout::Nested);
        assert!("deep".parse::<Layout>().is_err());
    }

    #[test]
    fn script_entry_targets() {
        assert!(ScriptEntry::Package.includes(ManifestKind::Package));
        assert!(!ScriptEntry::Package.includes(ManifestKind::Tooling));
        assert!(ScriptEntry::Both.includes(ManifestKind::Tooling));
        assert!(!ScriptEntry::None.includes(ManifestKind::Package));
    }

    #[test]
    fn options_validate_names() {
        assert!(ScaffoldOptions::new("my-project").validate().is_ok());
        assert!(ScaffoldOptions::new("my_app2").validate().is_ok());
        assert!(ScaffoldOptions::new("").validate().is_err());
        assert!(ScaffoldOptions::new("-leading").validate().is_err());
        assert!(ScaffoldOptions::new("bad/name").validate().is_err());
    }

    #[test]
    fn options_validate_python_version() {
        let opts = ScaffoldOptions::new("demo").with_python_version("3.11");
        assert!(opts.validate().is_ok());
        let opts = ScaffoldOptions::new("demo").with_python_version("three");
        assert!(opts.validate().is_err());
        let opts = ScaffoldOptions::new("demo").with_python_version("3");
        assert!(opts.validate().is_err());
        let opts = ScaffoldOptions::new("demo").with_python_version("3.12.1");
        assert!(opts.validate().is_ok());
        let opts = ScaffoldOptions::new("demo").with_python_version("3.12.1.4");
        assert!(matches!(
            opts.validate(),
            Err(DomainError::InvalidPythonVersion { version }) if version == "3.12.1.4"
        ));
    }

    #[test]
    fn python_tag_ignores_patch_level() {
        let opts = ScaffoldOptions::new("demo").with_python_version("3.12.1");
        assert_eq!(opts.python_tag(), "py312");
        assert_eq!(ScaffoldOptions::new("demo").with_python_version("3.9").python_tag(), "py39");
    }
}
