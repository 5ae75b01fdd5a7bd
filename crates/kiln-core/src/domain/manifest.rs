//! Idempotent composition of `pyproject.toml` manifests.
//!
//! [`ManifestComposer::compose`] merges a list of [`ManifestEntry`] values
//! into existing manifest text. Entries already present are skipped, so
//! repeated composition converges. Edits go through a format-preserving
//! document, so comments and layout of untouched items survive; when nothing
//! is added the original text comes back byte-for-byte.

use serde::Serialize;
use toml_edit::{Array, DocumentMut, Item, RawString, Table, TableLike, Value};

use crate::domain::DomainError;
use crate::domain::value_objects::{DependencyGroup, ManifestKind};

/// One unit a manifest must contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ManifestEntry {
    /// A PEP 508 requirement, keyed by its normalized name.
    Dependency { spec: String, group: DependencyGroup },
    /// Keys ensured inside a dotted table; existing keys are never touched.
    ConfigBlock { table: String, body: String },
    /// A `[project.scripts]` console entry point.
    Script { name: String, target: String },
}

impl ManifestEntry {
    pub fn dependency(spec: impl Into<String>, group: DependencyGroup) -> Self {
        Self::Dependency {
            spec: spec.into(),
            group,
        }
    }

    pub fn config_block(table: impl Into<String>, body: impl Into<String>) -> Self {
        Self::ConfigBlock {
            table: table.into(),
            body: body.into(),
        }
    }

    pub fn script(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Script {
            name: name.into(),
            target: target.into(),
        }
    }

    /// Short human-readable label used in reports.
    pub fn label(&self) -> String {
        match self {
            Self::Dependency { spec, group } => match group {
                DependencyGroup::Runtime => spec.clone(),
                DependencyGroup::Dev => format!("{spec} (dev)"),
            },
            Self::ConfigBlock { table, .. } => format!("[{table}]"),
            Self::Script { name, .. } => format!("script {name}"),
        }
    }
}

/// Result of one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub content: String,
    /// Labels of the entries that were actually added.
    pub added: Vec<String>,
}

impl Composition {
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

pub struct ManifestComposer;

impl ManifestComposer {
    /// Merge `entries` into `existing` (absent or empty means a new manifest).
    ///
    /// Fails with [`DomainError::ManifestParse`] when `existing` is not valid
    /// TOML or a slot kiln writes to has the wrong type. Nothing is emitted
    /// in that case.
    pub fn compose(
        kind: ManifestKind,
        existing: Option<&str>,
        entries: &[ManifestEntry],
    ) -> Result<Composition, DomainError> {
        let original = existing.unwrap_or_default();
        let mut doc = if original.trim().is_empty() {
            DocumentMut::new()
        } else {
            original
                .parse::<DocumentMut>()
                .map_err(|e| parse_error(kind, e.message()))?
        };

        let mut added = Vec::new();
        for entry in entries {
            let root = doc.as_table_mut();
            let inserted = match entry {
                ManifestEntry::Dependency { spec, group } => {
                    ensure_dependency(root, kind, spec, *group)?
                }
                ManifestEntry::ConfigBlock { table, body } => {
                    ensure_block(root, kind, table, body)?
                }
                ManifestEntry::Script { name, target } => {
                    ensure_script(root, kind, name, target)?
                }
            };
            if inserted {
                added.push(entry.label());
            }
        }

        let content = if added.is_empty() {
            original.to_string()
        } else {
            doc.to_string()
        };
        Ok(Composition { content, added })
    }
}

/// PEP 503 normalized distribution name of a requirement string.
///
/// `"Scikit_Learn>=1.4"` and `"scikit-learn"` share the name `scikit-learn`;
/// extras, version specifiers and markers are ignored.
pub fn requirement_name(spec: &str) -> String {
    let spec = spec.trim();
    let end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(spec.len());

    let mut name = String::with_capacity(end);
    let mut separator = false;
    for c in spec[..end].chars() {
        if matches!(c, '-' | '_' | '.') {
            if !separator {
                name.push('-');
            }
            separator = true;
        } else {
            name.push(c.to_ascii_lowercase());
            separator = false;
        }
    }
    name
}

fn parse_error(kind: ManifestKind, reason: &str) -> DomainError {
    DomainError::ManifestParse {
        manifest: kind.relative_path().to_string(),
        reason: reason.trim().to_string(),
    }
}

/// Walk (creating as needed) the table at a dotted path.
///
/// Inline tables count as tables. Created tables are implicit, so a parent
/// that only holds sub-tables gets no header of its own.
fn table_at<'a>(
    doc: &'a mut Table,
    kind: ManifestKind,
    dotted: &str,
) -> Result<&'a mut dyn TableLike, DomainError> {
    let mut current: &mut dyn TableLike = doc;
    for segment in dotted.split('.') {
        if !current.contains_key(segment) {
            let mut table = Table::new();
            table.set_implicit(true);
            current.insert(segment, Item::Table(table));
        }
        current = match current.get_mut(segment).and_then(Item::as_table_like_mut) {
            Some(table) => table,
            None => return Err(parse_error(kind, &format!("`{dotted}` is not a table"))),
        };
    }
    Ok(current)
}

/// A fresh array laid out one item per line.
fn multiline_array() -> Array {
    let mut array = Array::new();
    array.set_trailing("\n");
    array.set_trailing_comma(true);
    array
}

/// Append `item`, following the line layout the array already uses.
fn push_item(array: &mut Array, item: &str) {
    let prefix = match array.iter().last() {
        Some(last) => last
            .decor()
            .prefix()
            .and_then(RawString::as_str)
            .filter(|p| p.contains('\n'))
            .map(str::to_owned),
        None => array
            .trailing()
            .as_str()
            .filter(|t| t.contains('\n'))
            .map(|_| "\n    ".to_owned()),
    };

    match prefix {
        Some(prefix) => {
            let mut value = Value::from(item);
            value.decor_mut().set_prefix(prefix);
            array.push_formatted(value);
        }
        None => array.push(item),
    }
}

fn ensure_dependency(
    doc: &mut Table,
    kind: ManifestKind,
    spec: &str,
    group: DependencyGroup,
) -> Result<bool, DomainError> {
    let (table_path, key) = match group {
        DependencyGroup::Runtime => ("project", "dependencies"),
        DependencyGroup::Dev => ("dependency-groups", "dev"),
    };

    let table = table_at(doc, kind, table_path)?;
    if !table.contains_key(key) {
        table.insert(key, Item::Value(Value::Array(multiline_array())));
    }
    let Some(array) = table.get_mut(key).and_then(Item::as_array_mut) else {
        return Err(parse_error(
            kind,
            &format!("`{table_path}.{key}` is not an array"),
        ));
    };

    let name = requirement_name(spec);
    // Non-string items (e.g. `{ include-group = "..." }`) are left alone.
    let present = array
        .iter()
        .filter_map(Value::as_str)
        .any(|existing| requirement_name(existing) == name);
    if present {
        return Ok(false);
    }

    push_item(array, spec.trim());
    Ok(true)
}

fn ensure_block(
    doc: &mut Table,
    kind: ManifestKind,
    table: &str,
    body: &str,
) -> Result<bool, DomainError> {
    let block = body
        .parse::<DocumentMut>()
        .map_err(|e| DomainError::InvalidConfigBlock {
            table: table.to_string(),
            reason: e.message().trim().to_string(),
        })?;

    let target = table_at(doc, kind, table)?;
    let mut changed = false;
    for (key, item) in block.iter() {
        if !target.contains_key(key) {
            target.insert(key, item.clone());
            changed = true;
        }
    }
    Ok(changed)
}

fn ensure_script(
    doc: &mut Table,
    kind: ManifestKind,
    name: &str,
    target: &str,
) -> Result<bool, DomainError> {
    let scripts = table_at(doc, kind, "project.scripts")?;
    if scripts.contains_key(name) {
        return Ok(false);
    }
    scripts.insert(name, toml_edit::value(target));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(spec: &str) -> ManifestEntry {
        ManifestEntry::dependency(spec, DependencyGroup::Dev)
    }

    fn runtime(spec: &str) -> ManifestEntry {
        ManifestEntry::dependency(spec, DependencyGroup::Runtime)
    }

    fn parse(content: &str) -> toml::Table {
        toml::from_str(content).unwrap()
    }

    fn strings(table: &toml::Table, path: &[&str]) -> Vec<String> {
        let mut value = table.get(path[0]).unwrap();
        for segment in &path[1..] {
            value = value.get(segment).unwrap();
        }
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn requirement_names_are_normalized() {
        assert_eq!(requirement_name("Scikit_Learn>=1.4"), "scikit-learn");
        assert_eq!(requirement_name("uvicorn[standard]"), "uvicorn");
        assert_eq!(requirement_name("  numpy ; python_version>'3.10'"), "numpy");
        assert_eq!(requirement_name("zope.interface"), "zope-interface");
        assert_eq!(requirement_name("a__b--c"), "a-b-c");
    }

    #[test]
    fn creates_manifest_from_nothing() {
        let out = ManifestComposer::compose(
            ManifestKind::Tooling,
            None,
            &[dev("ruff"), dev("pytest"), runtime("python-dotenv")],
        )
        .unwrap();

        assert!(out.changed());
        let doc = parse(&out.content);
        assert_eq!(strings(&doc, &["dependency-groups", "dev"]), ["ruff", "pytest"]);
        assert_eq!(strings(&doc, &["project", "dependencies"]), ["python-dotenv"]);
    }

    #[test]
    fn second_composition_returns_input_verbatim() {
        let entries = [dev("ruff"), ManifestEntry::config_block("tool.ruff", "line-length = 88")];
        let first = ManifestComposer::compose(ManifestKind::Tooling, None, &entries).unwrap();
        let second =
            ManifestComposer::compose(ManifestKind::Tooling, Some(&first.content), &entries)
                .unwrap();

        assert!(!second.changed());
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn unchanged_manifest_keeps_comments() {
        let existing = "# hand written\n[project]\nname = \"x\"\ndependencies = [\"numpy>=2\"]\n";
        let out =
            ManifestComposer::compose(ManifestKind::Package, Some(existing), &[runtime("NumPy")])
                .unwrap();
        assert_eq!(out.content, existing);
        assert!(out.added.is_empty());
    }

    #[test]
    fn duplicates_within_one_call_are_added_once() {
        let out = ManifestComposer::compose(
            ManifestKind::Tooling,
            None,
            &[runtime("pandas"), runtime("pandas>=2"), runtime("Pandas")],
        )
        .unwrap();
        let doc = parse(&out.content);
        assert_eq!(strings(&doc, &["project", "dependencies"]), ["pandas"]);
        assert_eq!(out.added, vec!["pandas".to_string()]);
    }

    #[test]
    fn existing_constraints_are_not_rewritten() {
        let existing = "[project]\ndependencies = [\"fastapi==0.110\"]\n";
        let out = ManifestComposer::compose(
            ManifestKind::Package,
            Some(existing),
            &[runtime("fastapi"), runtime("uvicorn[standard]")],
        )
        .unwrap();
        let doc = parse(&out.content);
        assert_eq!(
            strings(&doc, &["project", "dependencies"]),
            ["fastapi==0.110", "uvicorn[standard]"]
        );
    }

    #[test]
    fn unrelated_tables_survive() {
        let existing = "[tool.black]\nline-length = 100\n\n[project]\nname = \"x\"\n";
        let out =
            ManifestComposer::compose(ManifestKind::Tooling, Some(existing), &[dev("ruff")])
                .unwrap();
        let doc = parse(&out.content);
        assert_eq!(doc["tool"]["black"]["line-length"].as_integer(), Some(100));
        assert_eq!(doc["project"]["name"].as_str(), Some("x"));
    }

    #[test]
    fn config_block_only_adds_missing_keys() {
        let existing = "[tool.ruff]\nline-length = 120\n";
        let out = ManifestComposer::compose(
            ManifestKind::Tooling,
            Some(existing),
            &[ManifestEntry::config_block(
                "tool.ruff",
                "line-length = 88\ntarget-version = \"py312\"",
            )],
        )
        .unwrap();
        let doc = parse(&out.content);
        assert_eq!(doc["tool"]["ruff"]["line-length"].as_integer(), Some(120));
        assert_eq!(doc["tool"]["ruff"]["target-version"].as_str(), Some("py312"));
        assert_eq!(out.added, vec!["[tool.ruff]".to_string()]);
    }

    #[test]
    fn scripts_are_inserted_once() {
        let entry = ManifestEntry::script("demo", "demo.main:main");
        let first =
            ManifestComposer::compose(ManifestKind::Package, None, &[entry.clone()]).unwrap();
        let doc = parse(&first.content);
        assert_eq!(doc["project"]["scripts"]["demo"].as_str(), Some("demo.main:main"));

        let second =
            ManifestComposer::compose(ManifestKind::Package, Some(&first.content), &[entry])
                .unwrap();
        assert!(!second.changed());
    }

    #[test]
    fn comments_in_unrelated_tables_survive_an_append() {
        let existing = "# team policy: pin black\n[tool.black]\nline-length = 100 # agreed 2024\n";
        let out =
            ManifestComposer::compose(ManifestKind::Tooling, Some(existing), &[dev("ruff")])
                .unwrap();

        assert!(out.changed());
        assert!(out.content.starts_with(existing), "{}", out.content);
        assert_eq!(strings(&parse(&out.content), &["dependency-groups", "dev"]), ["ruff"]);
    }

    #[test]
    fn appends_follow_the_existing_array_layout() {
        let existing = "[project]\nname = \"x\" # keep\ndependencies = [\n    \"numpy\",\n]\n";
        let out =
            ManifestComposer::compose(ManifestKind::Package, Some(existing), &[runtime("pandas")])
                .unwrap();

        assert!(out.content.contains("name = \"x\" # keep"));
        assert!(out.content.contains("    \"numpy\",\n    \"pandas\",\n]"), "{}", out.content);
    }

    #[test]
    fn inline_tables_are_extended_in_place() {
        let existing = "[project]\nscripts = { old = \"x.main:main\" }\n";
        let out = ManifestComposer::compose(
            ManifestKind::Package,
            Some(existing),
            &[ManifestEntry::script("demo", "demo.main:main")],
        )
        .unwrap();
        let doc = parse(&out.content);
        assert_eq!(doc["project"]["scripts"]["old"].as_str(), Some("x.main:main"));
        assert_eq!(doc["project"]["scripts"]["demo"].as_str(), Some("demo.main:main"));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = ManifestComposer::compose(
            ManifestKind::Tooling,
            Some("[project\nname ="),
            &[dev("ruff")],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ManifestParse { manifest, .. } if manifest == "pyproject.toml"));
    }

    #[test]
    fn wrong_slot_type_is_a_parse_error() {
        let err = ManifestComposer::compose(
            ManifestKind::Package,
            Some("[project]\ndependencies = \"numpy\"\n"),
            &[runtime("pandas")],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ManifestParse { .. }));

        let err = ManifestComposer::compose(
            ManifestKind::Tooling,
            Some("project = 3\n"),
            &[runtime("pandas")],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ManifestParse { .. }));
    }

    #[test]
    fn malformed_block_body_is_reported() {
        let err = ManifestComposer::compose(
            ManifestKind::Tooling,
            None,
            &[ManifestEntry::config_block("tool.x", "not toml at all")],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfigBlock { table, .. } if table == "tool.x"));
    }
}
