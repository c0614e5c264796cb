use super::domain::{CourseSnapshot, EnrollmentStatistics, EnrollmentStatus};
use super::repository::EnrollmentStore;
use super::service::EnrollmentError;

/// Derives per-course counts from the store. Pure read: no locking, callers
/// accept a snapshot that may be stale by the time it is displayed.
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn snapshot<S: EnrollmentStore>(
        store: &S,
        course: &CourseSnapshot,
    ) -> Result<EnrollmentStatistics, EnrollmentError> {
        let approved = store.status_count(&course.id, EnrollmentStatus::Approved)?;
        let pending = store.status_count(&course.id, EnrollmentStatus::Pending)?;
        let waitlisted = store.status_count(&course.id, EnrollmentStatus::Waitlisted)?;
        let rejected = store.status_count(&course.id, EnrollmentStatus::Rejected)?;

        Ok(EnrollmentStatistics {
            total: approved + pending + waitlisted + rejected,
            approved,
            pending,
            waitlisted,
            available_slots: course.capacity.saturating_sub(approved),
        })
    }
}
