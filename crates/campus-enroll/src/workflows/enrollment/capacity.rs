use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    CourseId, CourseSnapshot, EnrollmentId, EnrollmentOutcome, EnrollmentRecord, EnrollmentStatus,
    StudentId,
};
use super::repository::EnrollmentStore;
use super::service::EnrollmentError;

/// Per-course lock handles. Admissions for unrelated courses never contend;
/// the registry mutex is held only long enough to clone a handle.
#[derive(Default)]
pub struct CourseLockRegistry {
    locks: Mutex<HashMap<CourseId, Arc<Mutex<()>>>>,
}

impl CourseLockRegistry {
    fn handle(&self, course_id: &CourseId) -> Result<Arc<Mutex<()>>, EnrollmentError> {
        let mut registry = self
            .locks
            .lock()
            .map_err(|_| EnrollmentError::LockTimeout(course_id.clone()))?;
        Ok(registry
            .entry(course_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Runs `body` inside the course-scoped critical section. A poisoned lock
    /// surfaces as the retryable `LockTimeout` error instead of a panic.
    pub fn with_exclusive<T>(
        &self,
        course_id: &CourseId,
        body: impl FnOnce() -> Result<T, EnrollmentError>,
    ) -> Result<T, EnrollmentError> {
        let handle = self.handle(course_id)?;
        let _section = handle
            .lock()
            .map_err(|_| EnrollmentError::LockTimeout(course_id.clone()))?;
        body()
    }
}

/// Decides whether a new admission fits within course capacity, performing the
/// decision and the row insert as one atomic unit per course.
#[derive(Default)]
pub struct CapacityGuard {
    locks: CourseLockRegistry,
}

impl CapacityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes the course-scoped critical section to the other mutating
    /// operations (status transitions, withdrawals, promotions) so every
    /// count-then-write sequence for a course serializes through one lock.
    pub fn with_course_section<T>(
        &self,
        course_id: &CourseId,
        body: impl FnOnce() -> Result<T, EnrollmentError>,
    ) -> Result<T, EnrollmentError> {
        self.locks.with_exclusive(course_id, body)
    }

    /// Standard admission: a free seat yields a `Pending` record awaiting the
    /// approval step, a full course yields a `Waitlisted` record ordered by
    /// `enrolled_at`. An existing record for the pair short-circuits without
    /// mutation.
    pub fn admit<S: EnrollmentStore>(
        &self,
        store: &S,
        course: &CourseSnapshot,
        student_id: &StudentId,
        id: EnrollmentId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        self.locks.with_exclusive(&course.id, || {
            if let Some(existing) = store.find_enrollment(student_id, &course.id)? {
                return Ok(EnrollmentOutcome::AlreadyEnrolled(existing));
            }

            let status = if Self::seat_holders(store, &course.id)? < course.capacity {
                EnrollmentStatus::Pending
            } else {
                EnrollmentStatus::Waitlisted
            };

            let record = store.insert(EnrollmentRecord::new(
                id,
                student_id.clone(),
                course.id.clone(),
                status,
                now,
            ))?;

            Ok(match status {
                EnrollmentStatus::Pending => EnrollmentOutcome::Admitted(record),
                _ => EnrollmentOutcome::Waitlisted(record),
            })
        })
    }

    /// Invite-code admission: inserts directly as `Approved` when a seat is
    /// free and refuses outright when the course is full. Never waitlists.
    pub fn admit_direct<S: EnrollmentStore>(
        &self,
        store: &S,
        course: &CourseSnapshot,
        student_id: &StudentId,
        id: EnrollmentId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        self.locks.with_exclusive(&course.id, || {
            if let Some(existing) = store.find_enrollment(student_id, &course.id)? {
                return Ok(EnrollmentOutcome::AlreadyEnrolled(existing));
            }

            if Self::seat_holders(store, &course.id)? >= course.capacity {
                return Err(EnrollmentError::CapacityExhausted);
            }

            let record = store.insert(EnrollmentRecord::new(
                id,
                student_id.clone(),
                course.id.clone(),
                EnrollmentStatus::Approved,
                now,
            ))?;

            Ok(EnrollmentOutcome::Admitted(record))
        })
    }

    /// Re-checks the hard invariant before any transition to `Approved`. Must
    /// be called with the course section held.
    pub fn confirm_vacancy<S: EnrollmentStore>(
        store: &S,
        course: &CourseSnapshot,
    ) -> Result<(), EnrollmentError> {
        let approved = store.status_count(&course.id, EnrollmentStatus::Approved)?;
        if approved >= course.capacity {
            return Err(EnrollmentError::CapacityExhausted);
        }
        Ok(())
    }

    fn seat_holders<S: EnrollmentStore>(
        store: &S,
        course_id: &CourseId,
    ) -> Result<u32, EnrollmentError> {
        let pending = store.status_count(course_id, EnrollmentStatus::Pending)?;
        let approved = store.status_count(course_id, EnrollmentStatus::Approved)?;
        Ok(pending + approved)
    }
}
