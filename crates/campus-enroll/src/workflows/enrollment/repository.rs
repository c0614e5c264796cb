use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Actor, CourseId, CourseSnapshot, EnrollmentId, EnrollmentRecord, EnrollmentStatus, RoleType,
    StatusChange, StudentId,
};

/// Persistence abstraction for enrollment rows so the service and guard
/// modules can be exercised against in-memory doubles.
///
/// `insert` enforces the one-active-record-per-(student, course) invariant and
/// reports a duplicate as `Conflict`. Callers are expected to hold the
/// course-scoped critical section around any count-then-mutate sequence; the
/// store itself only guarantees that individual calls are consistent.
pub trait EnrollmentStore: Send + Sync {
    fn insert(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError>;
    fn update(&self, record: EnrollmentRecord) -> Result<(), StoreError>;
    /// Removes and returns the record; withdrawal deletes rather than transitions.
    fn remove(&self, id: &EnrollmentId) -> Result<EnrollmentRecord, StoreError>;
    fn fetch(&self, id: &EnrollmentId) -> Result<Option<EnrollmentRecord>, StoreError>;
    fn find_enrollment(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;
    fn course_enrollments(&self, course_id: &CourseId) -> Result<Vec<EnrollmentRecord>, StoreError>;
    fn student_enrollments(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<EnrollmentRecord>, StoreError>;
    fn status_count(
        &self,
        course_id: &CourseId,
        status: EnrollmentStatus,
    ) -> Result<u32, StoreError>;
    /// The waitlisted record with the earliest `enrolled_at`, ties broken by id.
    fn earliest_waitlisted(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the external course catalog.
pub trait CourseDirectory: Send + Sync {
    fn course(&self, id: &CourseId) -> Result<Option<CourseSnapshot>, StoreError>;
    fn course_by_access_code(&self, code: &str) -> Result<Option<CourseSnapshot>, StoreError>;
}

/// Authorization decisions supplied by the external policy engine. The core
/// never consults ambient session state; the policy is injected and queried
/// with explicit actor and course identifiers.
pub trait AuthorizationPolicy: Send + Sync {
    fn has_role(&self, actor: &Actor, role: RoleType) -> bool;
    fn is_teacher_of(&self, actor: &Actor, course_id: &CourseId) -> bool;
}

/// Outbound hook carrying committed status changes to the notification system.
/// Implementations must not block on delivery; the core fires and forgets.
pub trait StatusNotifier: Send + Sync {
    fn publish(&self, change: StatusChange) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an enrollment row for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub status: &'static str,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&EnrollmentRecord> for EnrollmentView {
    fn from(record: &EnrollmentRecord) -> Self {
        Self {
            enrollment_id: record.id.clone(),
            student_id: record.student_id.clone(),
            course_id: record.course_id.clone(),
            status: record.status.label(),
            enrolled_at: record.enrolled_at,
            updated_at: record.updated_at,
        }
    }
}
