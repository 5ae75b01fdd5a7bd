use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::domain::{
    entities::{common::RelativePath, render::RenderContext},
    error::DomainError,
    features::{FeatureRegistry, PACKAGE_INIT},
    manifest::ManifestEntry,
    value_objects::{DependencyGroup, ManifestKind, ScaffoldOptions, WritePolicy},
};

/// Everything a set of features needs on disk, computed without touching it.
///
/// Invariants:
/// - every directory's ancestors are also planned, parents sort first
/// - each file path appears once (first contributing feature wins)
/// - no path escapes the root
#[derive(Debug, Clone, Serialize)]
pub struct PathPlan {
    root: PathBuf,
    features: Vec<&'static str>,
    directories: Vec<RelativePath>,
    files: Vec<GeneratedFile>,
    manifests: Vec<ManifestPlan>,
    skeletons: Vec<RelativePath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: RelativePath,
    pub content: String,
    pub policy: WritePolicy,
    pub feature: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestPlan {
    pub kind: ManifestKind,
    pub path: RelativePath,
    pub entries: Vec<ManifestEntry>,
}

impl PathPlan {
    /// Resolve `requested` against `registry` and lay out the result under `root`.
    ///
    /// Pure: the same inputs always produce the same plan, and the order of
    /// `requested` is irrelevant.
    pub fn compute<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        registry: &FeatureRegistry,
        requested: &[S],
        options: &ScaffoldOptions,
    ) -> Result<Self, DomainError> {
        options.validate()?;
        let features = registry.resolve(requested)?;
        let ctx = RenderContext::from_options(options);

        let mut directories = BTreeSet::new();
        let mut files: BTreeMap<RelativePath, GeneratedFile> = BTreeMap::new();
        let mut entries: BTreeMap<ManifestKind, Vec<ManifestEntry>> = BTreeMap::new();
        let mut skeletons = Vec::new();

        for def in &features {
            for dir in def.directories {
                let path = RelativePath::try_new(ctx.render(dir))?;
                insert_with_ancestors(&mut directories, path);
            }

            for file in def.files {
                let path = RelativePath::try_new(ctx.render(file.path))?;
                directories.extend(path.ancestors());
                if files.contains_key(&path) {
                    debug!(path = %path, feature = def.id, "file already planned, keeping first");
                    continue;
                }
                files.insert(
                    path.clone(),
                    GeneratedFile {
                        path,
                        content: ctx.render(file.template),
                        policy: file.policy,
                        feature: def.id,
                    },
                );
            }

            for dep in def.dependencies {
                let entry = ManifestEntry::dependency(dep.spec, dep.group);
                entries
                    .entry(ManifestKind::Tooling)
                    .or_default()
                    .push(entry.clone());
                if dep.group == DependencyGroup::Runtime {
                    entries.entry(ManifestKind::Package).or_default().push(entry);
                }
            }

            for block in def.config_blocks {
                entries
                    .entry(block.manifest)
                    .or_default()
                    .push(ManifestEntry::config_block(block.table, ctx.render(block.body)));
            }

            if let Some(dir) = def.skeleton_dir {
                skeletons.push(RelativePath::try_new(ctx.render(dir))?);
            }
        }

        let script_target = ctx.render("{{PACKAGE_MODULE}}.main:main");
        let script_name = ctx.render("{{PROJECT_NAME_KEBAB}}");
        for kind in ManifestKind::ALL {
            if options.script_entry.includes(kind) {
                entries
                    .entry(kind)
                    .or_default()
                    .push(ManifestEntry::script(&script_name, &script_target));
            }
        }

        if features.iter().any(|d| d.initializes_packages) {
            let package_dir = RelativePath::try_new(ctx.render("{{PACKAGE_DIR}}"))?;
            let packages: Vec<RelativePath> = directories
                .iter()
                .filter(|d| d.is_within(&package_dir))
                .cloned()
                .collect();
            for dir in packages {
                let path = dir.join("__init__.py")?;
                files.entry(path.clone()).or_insert(GeneratedFile {
                    path,
                    content: String::new(),
                    policy: WritePolicy::CreateIfAbsent,
                    feature: PACKAGE_INIT,
                });
            }
        }

        let manifests = ManifestKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let list = entries.remove(&kind)?;
                Some((kind, list))
            })
            .map(|(kind, list)| {
                Ok(ManifestPlan {
                    kind,
                    path: RelativePath::try_new(kind.relative_path())?,
                    entries: list,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let plan = Self {
            root: root.into(),
            features: features.iter().map(|d| d.id).collect(),
            directories: directories.into_iter().collect(),
            files: files.into_values().collect(),
            manifests,
            skeletons,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// No path is planned both as a directory and as a file.
    pub fn validate(&self) -> Result<(), DomainError> {
        let dirs: HashSet<&RelativePath> = self.directories.iter().collect();
        for manifest in &self.manifests {
            if dirs.contains(&manifest.path) {
                return Err(DomainError::InvalidPath {
                    path: manifest.path.to_string(),
                });
            }
        }
        match self.files.iter().find(|f| dirs.contains(&f.path)) {
            Some(clash) => Err(DomainError::InvalidPath {
                path: clash.path.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolved feature ids, prerequisites first.
    pub fn features(&self) -> &[&'static str] {
        &self.features
    }

    /// Planned directories, parents before children.
    pub fn directories(&self) -> &[RelativePath] {
        &self.directories
    }

    /// Planned files, sorted by path.
    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn manifests(&self) -> &[ManifestPlan] {
        &self.manifests
    }

    /// Directories that receive a downloaded application skeleton.
    pub fn skeletons(&self) -> &[RelativePath] {
        &self.skeletons
    }

    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path.as_path() == Path::new(path))
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.iter().any(|d| d.as_path() == Path::new(path))
    }

    /// First-level entries of the root this plan would create.
    pub fn top_level(&self) -> BTreeSet<RelativePath> {
        self.directories
            .iter()
            .chain(self.files.iter().map(|f| &f.path))
            .chain(self.manifests.iter().map(|m| &m.path))
            .map(|p| p.ancestors().into_iter().next().unwrap_or_else(|| p.clone()))
            .collect()
    }

    pub fn absolute(&self, path: &RelativePath) -> PathBuf {
        self.root.join(path)
    }
}

fn insert_with_ancestors(set: &mut BTreeSet<RelativePath>, path: RelativePath) {
    set.extend(path.ancestors());
    set.insert(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Layout, ScriptEntry};

    fn plan(features: &[&str]) -> PathPlan {
        PathPlan::compute(
            "/work",
            &FeatureRegistry::builtin(),
            features,
            &ScaffoldOptions::new("demo"),
        )
        .unwrap()
    }

    #[test]
    fn base_plan_lays_out_project() {
        let plan = plan(&[]);
        for dir in ["src", "src/demo", "tests", "data", "docs", "config"] {
            assert!(plan.has_directory(dir), "missing {dir}");
        }
        assert!(plan.file("src/demo/main.py").is_some());
        assert!(plan.file("src/demo/__init__.py").is_some());
        assert!(plan.file("tests/test_placeholder.py").is_some());
        assert_eq!(
            plan.file(".gitignore").map(|f| f.policy),
            Some(WritePolicy::AlwaysOverwrite)
        );
        assert_eq!(plan.file(".env").map(|f| f.policy), Some(WritePolicy::CreateIfAbsent));
    }

    #[test]
    fn parents_precede_children() {
        let plan = plan(&["llm", "graph", "ml"]);
        let dirs = plan.directories();
        for (i, dir) in dirs.iter().enumerate() {
            for ancestor in dir.ancestors() {
                let pos = dirs.iter().position(|d| *d == ancestor).unwrap();
                assert!(pos < i, "{ancestor} must precede {dir}");
            }
        }
    }

    #[test]
    fn package_markers_cover_subpackages_only() {
        let plan = plan(&["llm", "graph"]);
        assert!(plan.file("src/demo/prompts/__init__.py").is_some());
        assert!(plan.file("src/demo/graphs/__init__.py").is_some());
        assert!(plan.file("src/__init__.py").is_none());
        assert!(plan.file("data/__init__.py").is_none());
    }

    #[test]
    fn flat_layout_marks_src_as_package() {
        let opts = ScaffoldOptions::new("demo").with_layout(Layout::Flat);
        let plan = PathPlan::compute("/w", &FeatureRegistry::builtin(), &["llm"], &opts).unwrap();
        assert!(plan.file("src/main.py").is_some());
        assert!(plan.file("src/__init__.py").is_some());
        assert!(plan.file("src/prompts/system.md").is_some());
    }

    #[test]
    fn plan_is_commutative() {
        let a = plan(&["notebook", "llm", "ml"]);
        let b = plan(&["ml", "notebook", "llm"]);
        assert_eq!(a.features(), b.features());
        assert_eq!(a.directories(), b.directories());
        assert_eq!(a.files(), b.files());
        assert_eq!(a.manifests(), b.manifests());
    }

    #[test]
    fn runtime_deps_go_to_both_manifests_dev_only_to_tooling() {
        let plan = plan(&["notebook", "ml"]);
        let tooling = &plan.manifests()[0];
        let package = &plan.manifests()[1];
        assert_eq!(tooling.kind, ManifestKind::Tooling);
        assert_eq!(package.path.to_string(), "src/pyproject.toml");

        let has = |m: &ManifestPlan, spec: &str| {
            m.entries
                .iter()
                .any(|e| matches!(e, ManifestEntry::Dependency { spec: s, .. } if s == spec))
        };
        assert!(has(tooling, "jupyter") && !has(package, "jupyter"));
        assert!(has(tooling, "numpy") && has(package, "numpy"));
    }

    #[test]
    fn script_entry_follows_option() {
        let opts = ScaffoldOptions::new("demo").with_script_entry(ScriptEntry::None);
        let without = PathPlan::compute::<&str>("/w", &FeatureRegistry::builtin(), &[], &opts).unwrap();
        let scripts = without
            .manifests()
            .iter()
            .flat_map(|m| &m.entries)
            .filter(|e| matches!(e, ManifestEntry::Script { .. }))
            .count();
        assert_eq!(scripts, 0);

        let default = plan(&[]);
        let package = &default.manifests()[1];
        assert!(package.entries.contains(&ManifestEntry::script("demo", "demo.main:main")));
    }

    #[test]
    fn templates_are_rendered() {
        let opts = ScaffoldOptions::new("My-App").with_python_version("3.11");
        let plan = PathPlan::compute::<&str>("/w", &FeatureRegistry::builtin(), &[], &opts).unwrap();
        assert_eq!(plan.file(".python-version").unwrap().content, "3.11\n");
        assert!(plan.file("src/my_app/main.py").unwrap().content.contains("My-App"));
    }

    #[test]
    fn web_app_plans_a_skeleton() {
        let plan = plan(&["fastapi"]);
        assert!(plan.has_directory("app"));
        assert_eq!(plan.skeletons()[0].to_string(), "app");
        assert!(plan.features().contains(&"web-app"));
    }

    #[test]
    fn unknown_feature_fails_before_planning() {
        let result = PathPlan::compute(
            "/w",
            &FeatureRegistry::builtin(),
            &["quantum"],
            &ScaffoldOptions::new("demo"),
        );
        assert!(matches!(result, Err(DomainError::UnknownFeature { .. })));
    }

    #[test]
    fn top_level_lists_root_entries() {
        let plan = plan(&["ml"]);
        let top: Vec<String> = plan.top_level().iter().map(|p| p.to_string()).collect();
        assert!(top.contains(&"src".to_string()));
        assert!(top.contains(&"models".to_string()));
        assert!(top.contains(&"pyproject.toml".to_string()));
        assert!(!top.contains(&"src/demo".to_string()));
    }
}
