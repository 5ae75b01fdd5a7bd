use super::DomainError;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A filesystem path guaranteed to stay inside the project root.
///
/// Invariant: never absolute, never contains `..`, never empty.
/// Enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Fallible constructor.
    ///
    /// `.` components are dropped so `./src` and `src` compare equal.
    pub fn try_new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let reject = || DomainError::InvalidPath {
            path: path.display().to_string(),
        };

        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(reject());
                }
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(reject());
        }
        Ok(Self(normalized))
    }

    /// Every proper ancestor, outermost first (`a`, `a/b` for `a/b/c`).
    pub fn ancestors(&self) -> Vec<RelativePath> {
        let mut out: Vec<RelativePath> = self
            .0
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| Self(p.to_path_buf()))
            .collect();
        out.reverse();
        out
    }

    /// Join a segment, maintaining the relative invariant.
    pub fn join(&self, segment: impl AsRef<Path>) -> Result<Self, DomainError> {
        Self::try_new(self.0.join(segment))
    }

    /// `true` if `self` equals `other` or lies beneath it.
    pub fn is_within(&self, other: &RelativePath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Number of path components.
    pub fn depth(&self) -> usize {
        self.0.components().count()
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        assert!(RelativePath::try_new("/etc/passwd").is_err());
        assert!(RelativePath::try_new("../outside").is_err());
        assert!(RelativePath::try_new("src/../../x").is_err());
        assert!(RelativePath::try_new("").is_err());
        assert!(RelativePath::try_new(".").is_err());
    }

    #[test]
    fn normalizes_current_dir() {
        let a = RelativePath::try_new("./src/./pkg").unwrap();
        let b = RelativePath::try_new("src/pkg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ancestors_are_outermost_first() {
        let p = RelativePath::try_new("src/pkg/prompts").unwrap();
        let names: Vec<String> = p.ancestors().iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["src", "src/pkg"]);
    }

    #[test]
    fn ordering_puts_parents_before_children() {
        let mut paths = vec![
            RelativePath::try_new("src/pkg").unwrap(),
            RelativePath::try_new("src-extra").unwrap(),
            RelativePath::try_new("src").unwrap(),
        ];
        paths.sort();
        assert_eq!(paths[0].to_string(), "src");
        assert_eq!(paths[1].to_string(), "src/pkg");
    }

    #[test]
    fn within_checks_prefix_by_component() {
        let pkg = RelativePath::try_new("src/pkg").unwrap();
        assert!(RelativePath::try_new("src/pkg/graphs").unwrap().is_within(&pkg));
        assert!(pkg.is_within(&pkg));
        assert!(!RelativePath::try_new("src/pkg2").unwrap().is_within(&pkg));
    }
}
