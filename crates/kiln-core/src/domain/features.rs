//! Feature module registry.
//!
//! Every feature is described exactly once by a [`FeatureDef`] in
//! [`FEATURE_REGISTRY`]. Path and content templates use `{{VARIABLE}}`
//! placeholders resolved by [`RenderContext`](crate::domain::RenderContext).
//!
//! # Adding a New Feature
//!
//! 1. Add one [`FeatureDef`] entry to [`FEATURE_REGISTRY`]
//! 2. Add a `kiln add-<id>` alias in the CLI if it deserves one
//! 3. That's it, planning and manifest composition derive from the table

use std::collections::HashSet;

use crate::domain::DomainError;
use crate::domain::value_objects::{DependencyGroup, ManifestKind, WritePolicy};

/// Identifier of the implicit feature every plan includes.
pub const BASE: &str = "base";

/// Identifier of the package-initializer step.
pub const PACKAGE_INIT: &str = "package-init";

/// A file a feature contributes.
#[derive(Debug, Clone, Copy)]
pub struct FileDef {
    pub path: &'static str,
    pub template: &'static str,
    pub policy: WritePolicy,
}

/// A requirement a feature declares.
#[derive(Debug, Clone, Copy)]
pub struct DependencyDef {
    pub spec: &'static str,
    pub group: DependencyGroup,
}

/// A TOML table body a feature ensures inside one manifest.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBlockDef {
    pub manifest: ManifestKind,
    /// Dotted table path, e.g. `tool.ruff.lint`.
    pub table: &'static str,
    pub body: &'static str,
}

/// Declarative description of one feature module.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDef {
    pub id: &'static str,
    pub summary: &'static str,
    /// Alternative names accepted on the command line.
    pub aliases: &'static [&'static str],
    /// Prerequisite feature ids, resolved transitively.
    pub requires: &'static [&'static str],
    pub directories: &'static [&'static str],
    pub files: &'static [FileDef],
    /// Runtime deps land in both manifests, dev deps in the tooling manifest.
    pub dependencies: &'static [DependencyDef],
    pub config_blocks: &'static [ConfigBlockDef],
    /// Plans an `__init__.py` in every directory under the package dir.
    pub initializes_packages: bool,
    /// Directory a prebuilt application skeleton is extracted into.
    pub skeleton_dir: Option<&'static str>,
}

impl FeatureDef {
    /// Empty definition, used as the base for struct-update syntax.
    pub const EMPTY: FeatureDef = FeatureDef {
        id: "",
        summary: "",
        aliases: &[],
        requires: &[],
        directories: &[],
        files: &[],
        dependencies: &[],
        config_blocks: &[],
        initializes_packages: false,
        skeleton_dir: None,
    };

    fn answers_to(&self, name: &str) -> bool {
        self.id == name || self.aliases.contains(&name)
    }

    pub fn dependencies_in(
        &self,
        group: DependencyGroup,
    ) -> impl Iterator<Item = &'static str> + use<> {
        let deps: &'static [DependencyDef] = self.dependencies;
        deps.iter()
            .filter(move |d| d.group == group)
            .map(|d| d.spec)
    }
}

const fn runtime(spec: &'static str) -> DependencyDef {
    DependencyDef {
        spec,
        group: DependencyGroup::Runtime,
    }
}

const fn dev(spec: &'static str) -> DependencyDef {
    DependencyDef {
        spec,
        group: DependencyGroup::Dev,
    }
}

const fn keep(path: &'static str, template: &'static str) -> FileDef {
    FileDef {
        path,
        template,
        policy: WritePolicy::CreateIfAbsent,
    }
}

const fn regenerate(path: &'static str, template: &'static str) -> FileDef {
    FileDef {
        path,
        template,
        policy: WritePolicy::AlwaysOverwrite,
    }
}

// ── Content templates ────────────────────────────────────────────────────────

const MAIN_PY: &str = r#""""Entry point for {{PROJECT_NAME}}."""

from dotenv import load_dotenv


def main() -> None:
    load_dotenv()
    print("Hello from {{PROJECT_NAME}}!")


if __name__ == "__main__":
    main()
"#;

const TEST_PLACEHOLDER_PY: &str = r#"def test_placeholder() -> None:
    assert True
"#;

/// Ignore patterns written to `.gitignore` on every run.
pub const GITIGNORE: &str = "# Managed by kiln; regenerated on every run.
.venv/
__pycache__/
*.py[cod]
*.egg-info/
.pytest_cache/
.ruff_cache/
.mypy_cache/
.coverage
coverage.xml
htmlcov/
build/
dist/
.ipynb_checkpoints/
.env
";

const ENV_FILE: &str = "# Local environment for {{PROJECT_NAME}}. Never committed.
";

const README_MD: &str = "# {{PROJECT_NAME}}

## Development

```sh
uv sync
uv run pytest
```
";

const PYTHON_VERSION_FILE: &str = "{{PYTHON_VERSION}}
";

const NOTEBOOK: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "metadata": {},
   "source": ["# {{PROJECT_NAME}} exploration"]
  }
 ],
 "metadata": {
  "kernelspec": {
   "display_name": "Python 3",
   "language": "python",
   "name": "python3"
  },
  "language_info": {
   "name": "python",
   "version": "{{PYTHON_VERSION}}"
  }
 },
 "nbformat": 4,
 "nbformat_minor": 5
}
"##;

const SYSTEM_PROMPT: &str = "You are a helpful assistant for {{PROJECT_NAME}}.
";

const GRAPH_PY: &str = r#""""Graph construction helpers."""

import networkx as nx


def build_graph() -> nx.Graph:
    return nx.Graph()
"#;

const PROJECT_TOOLING: &str = r#"name = "{{PROJECT_NAME_KEBAB}}"
version = "0.1.0"
description = ""
readme = "README.md"
requires-python = ">={{PYTHON_VERSION}}"
"#;

const PROJECT_PACKAGE: &str = r#"name = "{{PROJECT_NAME_KEBAB}}"
version = "0.1.0"
requires-python = ">={{PYTHON_VERSION}}"
"#;

const RUFF: &str = r#"line-length = 88
target-version = "{{PYTHON_TAG}}"
src = ["src", "tests"]
"#;

const RUFF_LINT: &str = r#"select = ["E", "F", "I", "B", "UP"]
"#;

const PYTEST: &str = r#"testpaths = ["tests"]
pythonpath = ["src"]
"#;

const BUILD_SYSTEM: &str = r#"requires = ["hatchling"]
build-backend = "hatchling.build"
"#;

// ── Registry ─────────────────────────────────────────────────────────────────

/// Single source of truth for all feature modules.
///
/// Ordering: prerequisites appear before their dependents. Resolution does
/// not rely on it, but `kiln features` lists in this order.
pub static FEATURE_REGISTRY: &[FeatureDef] = &[
    FeatureDef {
        id: PACKAGE_INIT,
        summary: "Package initializer: __init__.py in every package directory",
        initializes_packages: true,
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: BASE,
        summary: "Source tree, placeholder test, ignore/env files, manifests, dev tooling",
        requires: &[PACKAGE_INIT],
        directories: &[
            "{{SOURCE_DIR}}",
            "{{PACKAGE_DIR}}",
            "tests",
            "data",
            "docs",
            "config",
        ],
        files: &[
            keep("{{PACKAGE_DIR}}/main.py", MAIN_PY),
            keep("tests/__init__.py", ""),
            keep("tests/test_placeholder.py", TEST_PLACEHOLDER_PY),
            keep("README.md", README_MD),
            keep(".env", ENV_FILE),
            keep(".python-version", PYTHON_VERSION_FILE),
            regenerate(".gitignore", GITIGNORE),
        ],
        dependencies: &[
            dev("ruff"),
            dev("pytest"),
            dev("pytest-cov"),
            runtime("python-dotenv"),
        ],
        config_blocks: &[
            ConfigBlockDef {
                manifest: ManifestKind::Tooling,
                table: "project",
                body: PROJECT_TOOLING,
            },
            ConfigBlockDef {
                manifest: ManifestKind::Tooling,
                table: "tool.ruff",
                body: RUFF,
            },
            ConfigBlockDef {
                manifest: ManifestKind::Tooling,
                table: "tool.ruff.lint",
                body: RUFF_LINT,
            },
            ConfigBlockDef {
                manifest: ManifestKind::Tooling,
                table: "tool.pytest.ini_options",
                body: PYTEST,
            },
            ConfigBlockDef {
                manifest: ManifestKind::Package,
                table: "project",
                body: PROJECT_PACKAGE,
            },
            ConfigBlockDef {
                manifest: ManifestKind::Package,
                table: "build-system",
                body: BUILD_SYSTEM,
            },
        ],
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: "notebook",
        summary: "Jupyter notebooks directory and kernel tooling",
        requires: &[BASE],
        directories: &["notebooks"],
        files: &[keep("notebooks/exploration.ipynb", NOTEBOOK)],
        dependencies: &[dev("jupyter"), dev("ipykernel")],
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: "ml",
        summary: "Data/model directories and the scientific Python stack",
        requires: &[BASE],
        directories: &["data/raw", "data/processed", "models"],
        files: &[
            keep("data/raw/.gitkeep", ""),
            keep("data/processed/.gitkeep", ""),
            keep("models/.gitkeep", ""),
        ],
        dependencies: &[
            runtime("numpy"),
            runtime("pandas"),
            runtime("scikit-learn"),
            runtime("matplotlib"),
        ],
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: "llm",
        summary: "Prompts subpackage and LLM client libraries",
        requires: &[BASE, PACKAGE_INIT],
        directories: &["{{PACKAGE_DIR}}/prompts"],
        files: &[keep("{{PACKAGE_DIR}}/prompts/system.md", SYSTEM_PROMPT)],
        dependencies: &[runtime("openai"), runtime("tiktoken"), runtime("langchain")],
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: "graph",
        summary: "Graphs subpackage and graph analysis libraries",
        requires: &[BASE, PACKAGE_INIT],
        directories: &["{{PACKAGE_DIR}}/graphs"],
        files: &[keep("{{PACKAGE_DIR}}/graphs/build.py", GRAPH_PY)],
        dependencies: &[runtime("networkx"), runtime("pyvis")],
        ..FeatureDef::EMPTY
    },
    FeatureDef {
        id: "web-app",
        summary: "Downloaded FastAPI application skeleton under app/",
        aliases: &["fastapi"],
        requires: &[BASE],
        directories: &["app"],
        dependencies: &[runtime("fastapi"), runtime("uvicorn[standard]")],
        skeleton_dir: Some("app"),
        ..FeatureDef::EMPTY
    },
];

/// Queryable, immutable catalog of feature definitions.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRegistry {
    defs: &'static [FeatureDef],
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FeatureRegistry {
    /// The catalog shipped with kiln.
    pub fn builtin() -> Self {
        Self {
            defs: FEATURE_REGISTRY,
        }
    }

    /// A registry over an arbitrary table. Not validated; see [`Self::validate`].
    pub fn new(defs: &'static [FeatureDef]) -> Self {
        Self { defs }
    }

    pub fn defs(&self) -> &'static [FeatureDef] {
        self.defs
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.defs.iter().map(|d| d.id).collect()
    }

    /// Look up a feature by id or alias.
    pub fn get(&self, name: &str) -> Option<&'static FeatureDef> {
        let name = name.trim();
        self.defs.iter().find(|d| d.answers_to(name))
    }

    /// The subset of `names` not present in the catalog, in request order.
    pub fn unknown<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.get(n).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Transitive closure of `names` over prerequisites.
    ///
    /// `base` (when the catalog has one) is always included. Prerequisites
    /// come before their dependents and each feature appears once. The
    /// result depends only on the requested *set*, not on request order.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<&'static FeatureDef>, DomainError> {
        let mut roots: Vec<&'static FeatureDef> = Vec::new();
        if let Some(base) = self.get(BASE) {
            roots.push(base);
        }
        for name in names {
            roots.push(self.lookup(name.as_ref())?);
        }

        // Canonical order: catalog position, so the request order is irrelevant.
        roots.sort_by_key(|d| self.position(d.id));
        roots.dedup_by_key(|d| d.id);

        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        for def in roots {
            self.visit(def, &mut path, &mut done, &mut order)?;
        }
        Ok(order)
    }

    /// Check catalog integrity: unique names, known prerequisites, no cycles.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut names = HashSet::new();
        for def in self.defs {
            for name in std::iter::once(&def.id).chain(def.aliases) {
                if !names.insert(*name) {
                    return Err(DomainError::UnknownFeature {
                        id: format!("{name} (declared twice)"),
                        known: self.known(),
                    });
                }
            }
        }
        let all: Vec<&str> = self.ids();
        self.resolve(&all).map(|_| ())
    }

    fn visit(
        &self,
        def: &'static FeatureDef,
        path: &mut Vec<&'static str>,
        done: &mut HashSet<&'static str>,
        order: &mut Vec<&'static FeatureDef>,
    ) -> Result<(), DomainError> {
        if done.contains(def.id) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|id| *id == def.id) {
            let mut chain: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            chain.push(def.id.to_string());
            return Err(DomainError::DependencyCycle { chain });
        }

        path.push(def.id);
        for req in def.requires {
            let prerequisite = self.lookup(req)?;
            self.visit(prerequisite, path, done, order)?;
        }
        path.pop();

        done.insert(def.id);
        order.push(def);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&'static FeatureDef, DomainError> {
        self.get(name).ok_or_else(|| DomainError::UnknownFeature {
            id: name.to_string(),
            known: self.known(),
        })
    }

    fn position(&self, id: &str) -> usize {
        self.defs
            .iter()
            .position(|d| d.id == id)
            .unwrap_or(usize::MAX)
    }

    fn known(&self) -> Vec<String> {
        self.defs.iter().map(|d| d.id.to_string()).collect()
    }
}
