//! Course enrollment admission and lifecycle workflow.
//!
//! The admission decision and the resulting row insert run as one atomic unit
//! per course: every mutating operation serializes through a course-scoped
//! critical section so concurrent requests can never over-fill a course.
//! Reads (statistics, rosters) take no locks and return point-in-time
//! snapshots.

pub mod capacity;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod state;
pub mod statistics;
pub mod waitlist;

#[cfg(test)]
mod tests;

pub use capacity::{CapacityGuard, CourseLockRegistry};
pub use domain::{
    Actor, CourseId, CourseSnapshot, CourseStatus, EnrollmentId, EnrollmentOutcome,
    EnrollmentRecord, EnrollmentStatistics, EnrollmentStatus, RoleType, StatusChange, StudentId,
    UserId,
};
pub use repository::{
    AuthorizationPolicy, CourseDirectory, EnrollmentStore, EnrollmentView, NotifyError,
    StatusNotifier, StoreError,
};
pub use router::enrollment_router;
pub use service::{EnrollmentError, EnrollmentService};
pub use state::EnrollmentStateMachine;
pub use statistics::StatisticsAggregator;
pub use waitlist::WaitlistManager;
