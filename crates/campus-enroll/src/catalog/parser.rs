use std::io::Read;

use serde::{Deserialize, Deserializer};

use crate::workflows::enrollment::{CourseId, CourseSnapshot, CourseStatus, UserId};

use super::CatalogError;

/// Parses a course catalog CSV into snapshots ready to seed a directory.
///
/// Expected header: `Course ID,Name,Teacher ID,Capacity,Status,Access Code`.
/// Status defaults to `planned` when blank; a blank access code means the
/// course has no invite-code fast path.
pub fn parse_courses<R: Read>(reader: R) -> Result<Vec<CourseSnapshot>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut courses = Vec::new();

    for record in csv_reader.deserialize::<CatalogRow>() {
        let row = record?;
        courses.push(row.into_snapshot()?);
    }

    Ok(courses)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Course ID")]
    course_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Teacher ID")]
    teacher_id: String,
    #[serde(rename = "Capacity")]
    capacity: u32,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(
        rename = "Access Code",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    access_code: Option<String>,
}

impl CatalogRow {
    fn into_snapshot(self) -> Result<CourseSnapshot, CatalogError> {
        if self.capacity == 0 {
            return Err(CatalogError::InvalidCapacity {
                course_id: self.course_id,
            });
        }

        let status = match self.status.as_deref() {
            None => CourseStatus::Planned,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "planned" => CourseStatus::Planned,
                "active" => CourseStatus::Active,
                "completed" => CourseStatus::Completed,
                _ => {
                    return Err(CatalogError::UnknownStatus {
                        course_id: self.course_id,
                        value: value.to_string(),
                    })
                }
            },
        };

        Ok(CourseSnapshot {
            id: CourseId(self.course_id),
            name: self.name,
            teacher_id: UserId(self.teacher_id),
            capacity: self.capacity,
            status,
            access_code: self.access_code,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
