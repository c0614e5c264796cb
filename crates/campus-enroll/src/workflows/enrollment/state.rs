use super::domain::{Actor, CourseSnapshot, EnrollmentStatus, RoleType};
use super::repository::AuthorizationPolicy;
use super::service::EnrollmentError;

/// Legal status transitions and the actors allowed to trigger them.
///
/// `Pending` and `Waitlisted` are the only states reachable at creation time
/// (through the capacity guard). `Approved` and `Rejected` stay where they
/// are; leaving either means withdrawing, which deletes the record instead of
/// transitioning it.
pub struct EnrollmentStateMachine;

impl EnrollmentStateMachine {
    pub fn is_legal(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
        use EnrollmentStatus::*;
        matches!(
            (from, to),
            (Pending, Approved) | (Pending, Rejected) | (Waitlisted, Approved) | (Waitlisted, Rejected)
        )
    }

    pub fn ensure_legal(
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> Result<(), EnrollmentError> {
        if Self::is_legal(from, to) {
            Ok(())
        } else {
            Err(EnrollmentError::InvalidTransition { from, to })
        }
    }
}

/// An approver is an admin or the teacher of the course in question.
pub fn is_approver<P: AuthorizationPolicy + ?Sized>(
    policy: &P,
    actor: &Actor,
    course: &CourseSnapshot,
) -> bool {
    policy.has_role(actor, RoleType::Admin) || policy.is_teacher_of(actor, &course.id)
}
