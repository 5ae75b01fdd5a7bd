//! Catalog Service - feature metadata queries.
//!
//! Read-only view over the feature registry for listing and inspection.
//! Separated from the pipeline engine for single responsibility.

use serde::Serialize;

use crate::{
    domain::{DependencyGroup, DomainError, FeatureDef, FeatureRegistry},
    error::KilnResult,
};

/// Information about a feature for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {
    pub id: String,
    pub summary: String,
    pub aliases: Vec<String>,
    pub requires: Vec<String>,
    pub directories: Vec<String>,
    pub runtime_dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
    pub downloads_skeleton: bool,
}

impl From<&FeatureDef> for FeatureInfo {
    fn from(def: &FeatureDef) -> Self {
        let strings =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            id: def.id.to_string(),
            summary: def.summary.to_string(),
            aliases: strings(def.aliases),
            requires: strings(def.requires),
            directories: strings(def.directories),
            runtime_dependencies: def
                .dependencies_in(DependencyGroup::Runtime)
                .map(str::to_string)
                .collect(),
            dev_dependencies: def
                .dependencies_in(DependencyGroup::Dev)
                .map(str::to_string)
                .collect(),
            downloads_skeleton: def.skeleton_dir.is_some(),
        }
    }
}

/// Service for feature catalog queries.
pub struct CatalogService {
    registry: FeatureRegistry,
}

impl CatalogService {
    pub fn new(registry: FeatureRegistry) -> Self {
        Self { registry }
    }

    /// All features in catalog order.
    pub fn list(&self) -> Vec<FeatureInfo> {
        self.registry.defs().iter().map(FeatureInfo::from).collect()
    }

    /// A feature by id or alias.
    pub fn get(&self, name: &str) -> KilnResult<FeatureInfo> {
        self.registry
            .get(name)
            .map(FeatureInfo::from)
            .ok_or_else(|| {
                DomainError::UnknownFeature {
                    id: name.to_string(),
                    known: self.registry.ids().iter().map(|s| s.to_string()).collect(),
                }
                .into()
            })
    }
}
