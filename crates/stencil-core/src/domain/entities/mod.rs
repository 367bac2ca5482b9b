pub mod common;
pub mod definition;
pub mod plan;
pub mod project_structure;

pub use crate::domain::DomainError;
pub use definition::{Question, ScaffoldDefinition};
pub use plan::{FilePlan, PlannedFile, SourceFile};
pub use project_structure::ProjectStructure;
