pub mod common;
pub mod invocation;
pub mod path_plan;
pub mod render;

pub use crate::domain::DomainError;
pub use common::RelativePath;
pub use invocation::ToolInvocation;
pub use path_plan::{GeneratedFile, ManifestPlan, PathPlan};
pub use render::RenderContext;
