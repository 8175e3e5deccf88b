pub mod project;
pub mod types;

pub use project::{BuildingProject, FieldPath, FieldValue, PathError, Section, GENERAL_SECTION};
pub use types::{Finding, Severity};
