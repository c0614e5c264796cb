use chrono::{DateTime, Utc};
use tracing::debug;

use super::capacity::CapacityGuard;
use super::domain::{CourseSnapshot, EnrollmentRecord, EnrollmentStatus, StatusChange};
use super::repository::EnrollmentStore;
use super::service::EnrollmentError;

/// Promotes waitlisted requests when an `Approved` slot frees up.
pub struct WaitlistManager;

impl WaitlistManager {
    /// Picks the waitlisted record with the earliest `enrolled_at` (ties
    /// broken by record id), re-validates capacity, and transitions it to
    /// `Approved`. Returns the committed change for post-commit notification,
    /// or `None` when no one is waiting.
    ///
    /// Must run inside the same course section as the operation that freed
    /// the slot, otherwise two concurrent vacancies could promote the same
    /// record twice.
    pub fn promote_next<S: EnrollmentStore>(
        store: &S,
        course: &CourseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<(EnrollmentRecord, StatusChange)>, EnrollmentError> {
        let Some(mut next) = store.earliest_waitlisted(&course.id)? else {
            return Ok(None);
        };

        CapacityGuard::confirm_vacancy(store, course)?;

        let old_status = next.status;
        next.status = EnrollmentStatus::Approved;
        next.updated_at = now;
        store.update(next.clone())?;

        debug!(
            enrollment_id = %next.id,
            course_id = %course.id,
            "promoted waitlisted enrollment"
        );

        let change = StatusChange {
            enrollment_id: next.id.clone(),
            student_id: next.student_id.clone(),
            course_id: next.course_id.clone(),
            old_status,
            new_status: next.status,
        };
        Ok(Some((next, change)))
    }
}
