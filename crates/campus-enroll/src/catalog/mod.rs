//! CSV course-catalog import used to seed a `CourseDirectory`.

mod parser;

pub use parser::parse_courses;

/// Errors raised while importing a course catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("course '{course_id}' has a non-positive capacity")]
    InvalidCapacity { course_id: String },
    #[error("course '{course_id}' has unknown status '{value}'")]
    UnknownStatus { course_id: String, value: String },
}
