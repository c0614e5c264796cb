use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use campus_enroll::catalog::parse_courses;
use campus_enroll::error::AppError;
use campus_enroll::workflows::enrollment::{
    Actor, AuthorizationPolicy, CourseDirectory, CourseId, CourseSnapshot, CourseStatus,
    EnrollmentId, EnrollmentRecord, EnrollmentStatus, EnrollmentStore, NotifyError, RoleType,
    StatusChange, StatusNotifier, StoreError, StudentId, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEnrollmentStore {
    records: Arc<Mutex<HashMap<EnrollmentId, EnrollmentRecord>>>,
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn insert(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        let duplicate = guard.values().any(|existing| {
            existing.student_id == record.student_id && existing.course_id == record.course_id
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: EnrollmentRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn remove(&self, id: &EnrollmentId) -> Result<EnrollmentRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(id).ok_or(StoreError::NotFound)
    }

    fn fetch(&self, id: &EnrollmentId) -> Result<Option<EnrollmentRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_enrollment(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.student_id == *student_id && record.course_id == *course_id)
            .cloned())
    }

    fn course_enrollments(&self, course_id: &CourseId) -> Result<Vec<EnrollmentRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.course_id == *course_id)
            .cloned()
            .collect())
    }

    fn student_enrollments(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.student_id == *student_id)
            .cloned()
            .collect())
    }

    fn status_count(
        &self,
        course_id: &CourseId,
        status: EnrollmentStatus,
    ) -> Result<u32, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.course_id == *course_id && record.status == status)
            .count() as u32)
    }

    fn earliest_waitlisted(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| {
                record.course_id == *course_id && record.status == EnrollmentStatus::Waitlisted
            })
            .min_by(|a, b| {
                a.enrolled_at
                    .cmp(&b.enrolled_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCourseDirectory {
    courses: Arc<Mutex<HashMap<CourseId, CourseSnapshot>>>,
}

impl InMemoryCourseDirectory {
    pub(crate) fn insert(&self, course: CourseSnapshot) {
        self.courses
            .lock()
            .expect("directory mutex poisoned")
            .insert(course.id.clone(), course);
    }

    pub(crate) fn len(&self) -> usize {
        self.courses.lock().expect("directory mutex poisoned").len()
    }
}

impl CourseDirectory for InMemoryCourseDirectory {
    fn course(&self, id: &CourseId) -> Result<Option<CourseSnapshot>, StoreError> {
        let guard = self.courses.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn course_by_access_code(&self, code: &str) -> Result<Option<CourseSnapshot>, StoreError> {
        let guard = self.courses.lock().expect("directory mutex poisoned");
        Ok(guard
            .values()
            .find(|course| course.access_code.as_deref() == Some(code))
            .cloned())
    }
}

/// Policy adapter: role membership comes from the forwarded identity, the
/// teacher-of check resolves against the course directory.
#[derive(Clone)]
pub(crate) struct DirectoryAuthorizationPolicy {
    directory: InMemoryCourseDirectory,
}

impl DirectoryAuthorizationPolicy {
    pub(crate) fn new(directory: InMemoryCourseDirectory) -> Self {
        Self { directory }
    }
}

impl AuthorizationPolicy for DirectoryAuthorizationPolicy {
    fn has_role(&self, actor: &Actor, role: RoleType) -> bool {
        actor.roles.contains(&role)
    }

    fn is_teacher_of(&self, actor: &Actor, course_id: &CourseId) -> bool {
        self.directory
            .course(course_id)
            .ok()
            .flatten()
            .map(|course| course.teacher_id == actor.user_id)
            .unwrap_or(false)
    }
}

/// Default notifier: the transport lives elsewhere, so committed changes are
/// logged for the external system to pick up.
#[derive(Default, Clone)]
pub(crate) struct LoggingStatusNotifier;

impl StatusNotifier for LoggingStatusNotifier {
    fn publish(&self, change: StatusChange) -> Result<(), NotifyError> {
        info!(
            enrollment_id = %change.enrollment_id,
            student_id = %change.student_id,
            course_id = %change.course_id,
            from = change.old_status.label(),
            to = change.new_status.label(),
            "enrollment status changed"
        );
        Ok(())
    }
}

pub(crate) fn load_catalog(path: &Path) -> Result<Vec<CourseSnapshot>, AppError> {
    let file = File::open(path)?;
    Ok(parse_courses(file)?)
}

pub(crate) fn seed_demo_courses(directory: &InMemoryCourseDirectory) {
    directory.insert(CourseSnapshot {
        id: CourseId("CS-101".to_string()),
        name: "Intro to Programming".to_string(),
        teacher_id: UserId("t-ada".to_string()),
        capacity: 30,
        status: CourseStatus::Active,
        access_code: Some("FALL25CS".to_string()),
    });
    directory.insert(CourseSnapshot {
        id: CourseId("HIST-210".to_string()),
        name: "Modern History".to_string(),
        teacher_id: UserId("t-herodotus".to_string()),
        capacity: 25,
        status: CourseStatus::Planned,
        access_code: None,
    });
}
