use crate::domain::{
    entities::path_plan::PathPlan, error::DomainError, features::FeatureRegistry,
    value_objects::ScaffoldOptions,
};

/// Centralized domain validation.
///
/// All validation logic lives here, not scattered across entities.
pub struct DomainValidator;

impl DomainValidator {
    pub fn validate_options(options: &ScaffoldOptions) -> Result<(), DomainError> {
        options.validate()
    }

    pub fn validate_registry(registry: &FeatureRegistry) -> Result<(), DomainError> {
        registry.validate()
    }

    pub fn validate_plan(plan: &PathPlan) -> Result<(), DomainError> {
        plan.validate()
    }

    /// Reject requested features before anything is planned or written.
    pub fn validate_requested<S: AsRef<str>>(
        registry: &FeatureRegistry,
        requested: &[S],
    ) -> Result<(), DomainError> {
        match registry.unknown(requested).into_iter().next() {
            Some(id) => Err(DomainError::UnknownFeature {
                id,
                known: registry.ids().iter().map(|s| s.to_string()).collect(),
            }),
            None => Ok(()),
        }
    }
}
