//! Integration tests for kiln-core's public planning API.
//!
//! Adapter-backed end-to-end runs live in kiln-adapters, which depends on
//! this crate.

use kiln_core::domain::{ManifestComposer, ManifestKind, PathPlan};
use kiln_core::prelude::*;

fn options() -> ScaffoldOptions {
    ScaffoldOptions::new("demo")
}

/// Compose both manifests from scratch, then feed the output back in.
fn compose_twice(plan: &PathPlan) -> Vec<(String, String)> {
    plan.manifests()
        .iter()
        .map(|m| {
            let first = ManifestComposer::compose(m.kind, None, &m.entries).unwrap();
            let second =
                ManifestComposer::compose(m.kind, Some(&first.content), &m.entries).unwrap();
            assert!(!second.changed(), "{} did not converge", m.path);
            (first.content, second.content)
        })
        .collect()
}

#[test]
fn every_feature_combination_converges() {
    let registry = FeatureRegistry::builtin();
    let ids = registry.ids();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i..] {
            let plan = PathPlan::compute("/w", &registry, &[*a, *b], &options()).unwrap();
            for (first, second) in compose_twice(&plan) {
                assert_eq!(first, second);
            }
        }
    }
}

#[test]
fn activating_more_features_is_monotonic() {
    let registry = FeatureRegistry::builtin();
    let small = PathPlan::compute("/w", &registry, &["ml"], &options()).unwrap();
    let large = PathPlan::compute("/w", &registry, &["ml", "graph"], &options()).unwrap();

    for dir in small.directories() {
        assert!(large.directories().contains(dir), "{dir} dropped");
    }
    for file in small.files() {
        assert!(large.files().contains(file), "{} dropped", file.path);
    }
}

#[test]
fn package_manifest_lives_under_src() {
    let plan = PathPlan::compute::<&str>("/w", &FeatureRegistry::builtin(), &[], &options())
        .unwrap();
    let package = plan
        .manifests()
        .iter()
        .find(|m| m.kind == ManifestKind::Package)
        .unwrap();
    assert_eq!(package.path.to_string(), "src/pyproject.toml");

    let built = ManifestComposer::compose(package.kind, None, &package.entries).unwrap();
    let doc: toml::Table = toml::from_str(&built.content).unwrap();
    assert_eq!(
        doc["build-system"]["build-backend"].as_str(),
        Some("hatchling.build")
    );
    assert_eq!(doc["project"]["scripts"]["demo"].as_str(), Some("demo.main:main"));
}

#[test]
fn router_rejects_unknown_features_with_known_list() {
    let router = CommandRouter::new(FeatureRegistry::builtin(), RouterConfig::default());
    let err = router
        .route(
            &Command::Add {
                features: vec!["blockchain".into()],
            },
            &options(),
        )
        .unwrap_err();

    assert!(err.to_string().contains("blockchain"));
    assert!(err.suggestions().iter().any(|s| s.contains("llm")));
}
