use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::EnrollmentConfig;

use super::capacity::CapacityGuard;
use super::domain::{
    Actor, CourseId, CourseSnapshot, EnrollmentId, EnrollmentOutcome, EnrollmentRecord,
    EnrollmentStatistics, EnrollmentStatus, RoleType, StatusChange, StudentId,
};
use super::repository::{
    AuthorizationPolicy, CourseDirectory, EnrollmentStore, StatusNotifier, StoreError,
};
use super::state::{self, EnrollmentStateMachine};
use super::statistics::StatisticsAggregator;
use super::waitlist::WaitlistManager;

/// Service composing the capacity guard, state machine, waitlist manager, and
/// statistics aggregator over injected store, catalog, policy, and notifier
/// seams.
pub struct EnrollmentService<S, C, P, N> {
    store: Arc<S>,
    courses: Arc<C>,
    policy: Arc<P>,
    notifier: Arc<N>,
    guard: CapacityGuard,
    config: EnrollmentConfig,
}

static ENROLLMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_enrollment_id() -> EnrollmentId {
    let id = ENROLLMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EnrollmentId(format!("enr-{id:06}"))
}

impl<S, C, P, N> EnrollmentService<S, C, P, N>
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        courses: Arc<C>,
        policy: Arc<P>,
        notifier: Arc<N>,
        config: EnrollmentConfig,
    ) -> Self {
        Self {
            store,
            courses,
            policy,
            notifier,
            guard: CapacityGuard::new(),
            config,
        }
    }

    /// Caller-side capability check for submitting an enrollment request.
    pub fn authorize_enrollment(&self, actor: &Actor) -> Result<(), EnrollmentError> {
        if self.policy.has_role(actor, RoleType::Student) {
            Ok(())
        } else {
            Err(EnrollmentError::Unauthorized)
        }
    }

    /// Submit an enrollment request. A free seat admits the student with a
    /// `Pending` record awaiting approval; a full course waitlists them.
    pub fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        let course = self.open_course(&course_id)?;

        let outcome = self.guard.admit(
            self.store.as_ref(),
            &course,
            &student_id,
            next_enrollment_id(),
            Utc::now(),
        )?;

        match &outcome {
            EnrollmentOutcome::Admitted(record) => {
                info!(enrollment_id = %record.id, course_id = %course.id, "enrollment request admitted");
            }
            EnrollmentOutcome::Waitlisted(record) => {
                info!(enrollment_id = %record.id, course_id = %course.id, "enrollment request waitlisted");
            }
            EnrollmentOutcome::AlreadyEnrolled(_) => {}
        }

        Ok(outcome)
    }

    /// Invite-code fast path: joins the course as `Approved` in one step,
    /// bypassing the approval workflow but never the capacity invariant.
    pub fn join_with_access_code(
        &self,
        student_id: StudentId,
        access_code: &str,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        if !self.config.join_fast_path {
            return Err(EnrollmentError::InvalidAccessCode);
        }

        let course = self
            .courses
            .course_by_access_code(access_code)?
            .ok_or(EnrollmentError::InvalidAccessCode)?;
        if !course.accepts_requests() {
            return Err(EnrollmentError::CourseClosed);
        }

        let outcome = self.guard.admit_direct(
            self.store.as_ref(),
            &course,
            &student_id,
            next_enrollment_id(),
            Utc::now(),
        )?;

        if let EnrollmentOutcome::Admitted(record) = &outcome {
            info!(enrollment_id = %record.id, course_id = %course.id, "student joined via access code");
        }

        Ok(outcome)
    }

    /// Transition an enrollment to a new status. Requires an approver (admin
    /// or teacher of the course); any transition to `Approved` re-checks the
    /// capacity invariant inside the course section.
    pub fn update_status(
        &self,
        enrollment_id: &EnrollmentId,
        new_status: EnrollmentStatus,
        actor: &Actor,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let record = self
            .store
            .fetch(enrollment_id)?
            .ok_or(EnrollmentError::EnrollmentNotFound)?;
        let course = self
            .courses
            .course(&record.course_id)?
            .ok_or(EnrollmentError::CourseNotFound)?;

        if !state::is_approver(self.policy.as_ref(), actor, &course) {
            return Err(EnrollmentError::Unauthorized);
        }

        let (updated, change) = self.guard.with_course_section(&course.id, || {
            // Re-read inside the section: a concurrent withdrawal or
            // transition may have raced the unlocked fetch above.
            let mut current = self
                .store
                .fetch(enrollment_id)?
                .ok_or(EnrollmentError::EnrollmentNotFound)?;

            EnrollmentStateMachine::ensure_legal(current.status, new_status)?;
            if new_status == EnrollmentStatus::Approved {
                CapacityGuard::confirm_vacancy(self.store.as_ref(), &course)?;
            }

            let old_status = current.status;
            current.status = new_status;
            current.updated_at = Utc::now();
            self.store.update(current.clone())?;

            let change = StatusChange {
                enrollment_id: current.id.clone(),
                student_id: current.student_id.clone(),
                course_id: current.course_id.clone(),
                old_status,
                new_status,
            };
            Ok((current, change))
        })?;

        info!(
            enrollment_id = %updated.id,
            from = change.old_status.label(),
            to = change.new_status.label(),
            "enrollment status updated"
        );
        self.notify(change);
        Ok(updated)
    }

    /// Delete an enrollment. Students withdraw their own record in any
    /// status; an approver may remove an `Approved` record on a student's
    /// behalf. Removing an `Approved` record promotes the head of the
    /// waitlist synchronously.
    pub fn withdraw(
        &self,
        enrollment_id: &EnrollmentId,
        actor: &Actor,
    ) -> Result<(), EnrollmentError> {
        let record = self
            .store
            .fetch(enrollment_id)?
            .ok_or(EnrollmentError::EnrollmentNotFound)?;
        let course = self
            .courses
            .course(&record.course_id)?
            .ok_or(EnrollmentError::CourseNotFound)?;

        let owns = actor.is_student(&record.student_id);
        let approver_removal = record.status == EnrollmentStatus::Approved
            && state::is_approver(self.policy.as_ref(), actor, &course);
        if !owns && !approver_removal {
            return Err(EnrollmentError::Unauthorized);
        }

        let promotion = self.guard.with_course_section(&course.id, || {
            let removed = match self.store.remove(enrollment_id) {
                Ok(removed) => removed,
                Err(StoreError::NotFound) => return Err(EnrollmentError::EnrollmentNotFound),
                Err(err) => return Err(err.into()),
            };

            if removed.status == EnrollmentStatus::Approved {
                WaitlistManager::promote_next(self.store.as_ref(), &course, Utc::now())
            } else {
                Ok(None)
            }
        })?;

        info!(enrollment_id = %enrollment_id, course_id = %course.id, "enrollment withdrawn");
        if let Some((_, change)) = promotion {
            self.notify(change);
        }
        Ok(())
    }

    pub fn statistics(&self, course_id: &CourseId) -> Result<EnrollmentStatistics, EnrollmentError> {
        let course = self
            .courses
            .course(course_id)?
            .ok_or(EnrollmentError::CourseNotFound)?;
        StatisticsAggregator::snapshot(self.store.as_ref(), &course)
    }

    pub fn course_enrollments(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        self.require_course(course_id)?;
        Ok(self.store.course_enrollments(course_id)?)
    }

    /// The waitlist for a course in promotion order.
    pub fn waitlisted_students(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        self.require_course(course_id)?;
        let mut waitlisted: Vec<EnrollmentRecord> = self
            .store
            .course_enrollments(course_id)?
            .into_iter()
            .filter(|record| record.status == EnrollmentStatus::Waitlisted)
            .collect();
        waitlisted.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(waitlisted)
    }

    pub fn student_enrollments(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        Ok(self.store.student_enrollments(student_id)?)
    }

    fn open_course(&self, course_id: &CourseId) -> Result<CourseSnapshot, EnrollmentError> {
        let course = self.require_course(course_id)?;
        if !course.accepts_requests() {
            return Err(EnrollmentError::CourseClosed);
        }
        Ok(course)
    }

    fn require_course(&self, course_id: &CourseId) -> Result<CourseSnapshot, EnrollmentError> {
        self.courses
            .course(course_id)?
            .ok_or(EnrollmentError::CourseNotFound)
    }

    /// Post-commit emission: a committed transition is never rolled back
    /// because the notifier misbehaved.
    fn notify(&self, change: StatusChange) {
        if let Err(err) = self.notifier.publish(change.clone()) {
            warn!(
                enrollment_id = %change.enrollment_id,
                error = %err,
                "failed to publish status change"
            );
        }
    }
}

/// Error taxonomy returned by the enrollment service. `LockTimeout` is the
/// only kind callers may retry automatically; everything else is terminal for
/// that request.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("course not found")]
    CourseNotFound,
    #[error("enrollment not found")]
    EnrollmentNotFound,
    #[error("course is closed to enrollment")]
    CourseClosed,
    #[error("invalid access code")]
    InvalidAccessCode,
    #[error("actor is not permitted to perform this operation")]
    Unauthorized,
    #[error("course capacity exhausted")]
    CapacityExhausted,
    #[error("cannot move enrollment from {from} to {to}")]
    InvalidTransition {
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    },
    #[error("admission lock unavailable for course {0}, retry")]
    LockTimeout(CourseId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
