use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::EnrollmentConfig;
use crate::workflows::enrollment::domain::{
    Actor, CourseId, CourseSnapshot, CourseStatus, EnrollmentId, EnrollmentRecord,
    EnrollmentStatus, RoleType, StatusChange, StudentId, UserId,
};
use crate::workflows::enrollment::repository::{
    AuthorizationPolicy, CourseDirectory, EnrollmentStore, NotifyError, StatusNotifier, StoreError,
};
use crate::workflows::enrollment::service::EnrollmentService;

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<HashMap<EnrollmentId, EnrollmentRecord>>>,
}

impl EnrollmentStore for MemoryStore {
    fn insert(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        let duplicate = guard
            .values()
            .any(|existing| existing.student_id == record.student_id && existing.course_id == record.course_id);
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
pub(super) struct MemoryDirectory {
    courses: Arc<Mutex<HashMap<CourseId, CourseSnapshot>>>,
}

impl MemoryDirectory {
    pub(super) fn insert(&self, course: CourseSnapshot) {
        self.courses
            .lock()
            .expect("directory mutex poisoned")
            .insert(course.id.clone(), course);
    }
}

impl CourseDirectory for MemoryDirectory {
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

/// Policy double: roles come from the actor, teacher-of checks go through the
/// directory's `teacher_id`.
#[derive(Clone)]
pub(super) struct DirectoryPolicy {
    pub(super) directory: MemoryDirectory,
}

impl AuthorizationPolicy for DirectoryPolicy {
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

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    changes: Arc<Mutex<Vec<StatusChange>>>,
}

impl RecordingNotifier {
    pub(super) fn changes(&self) -> Vec<StatusChange> {
        self.changes.lock().expect("notifier mutex poisoned").clone()
    }
}

impl StatusNotifier for RecordingNotifier {
    fn publish(&self, change: StatusChange) -> Result<(), NotifyError> {
        self.changes
            .lock()
            .expect("notifier mutex poisoned")
            .push(change);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl StatusNotifier for FailingNotifier {
    fn publish(&self, _change: StatusChange) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("webhook offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl EnrollmentStore for UnavailableStore {
    fn insert(&self, _record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: EnrollmentRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _id: &EnrollmentId) -> Result<EnrollmentRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EnrollmentId) -> Result<Option<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn find_enrollment(
        &self,
        _student_id: &StudentId,
        _course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn course_enrollments(
        &self,
        _course_id: &CourseId,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn student_enrollments(
        &self,
        _student_id: &StudentId,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn status_count(
        &self,
        _course_id: &CourseId,
        _status: EnrollmentStatus,
    ) -> Result<u32, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn earliest_waitlisted(
        &self,
        _course_id: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService =
    EnrollmentService<MemoryStore, MemoryDirectory, DirectoryPolicy, RecordingNotifier>;

pub(super) fn enrollment_config() -> EnrollmentConfig {
    EnrollmentConfig {
        join_fast_path: true,
    }
}

pub(super) fn course(id: &str, capacity: u32) -> CourseSnapshot {
    CourseSnapshot {
        id: CourseId(id.to_string()),
        name: format!("Course {id}"),
        teacher_id: UserId(format!("teacher-{id}")),
        capacity,
        status: CourseStatus::Active,
        access_code: Some(format!("CODE-{id}")),
    }
}

pub(super) fn student_actor(id: &str) -> Actor {
    Actor::new(id, vec![RoleType::Student])
}

pub(super) fn admin_actor() -> Actor {
    Actor::new("admin-1", vec![RoleType::Admin])
}

pub(super) fn teacher_actor(course_id: &str) -> Actor {
    Actor::new(format!("teacher-{course_id}"), vec![RoleType::Teacher])
}

pub(super) fn build_service() -> (Arc<TestService>, MemoryStore, MemoryDirectory, RecordingNotifier)
{
    let store = MemoryStore::default();
    let directory = MemoryDirectory::default();
    let notifier = RecordingNotifier::default();
    let policy = DirectoryPolicy {
        directory: directory.clone(),
    };

    let service = Arc::new(EnrollmentService::new(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(policy),
        Arc::new(notifier.clone()),
        enrollment_config(),
    ));

    (service, store, directory, notifier)
}

/// Service wired to a course with the given capacity; returns the course id.
pub(super) fn service_with_course(
    id: &str,
    capacity: u32,
) -> (
    Arc<TestService>,
    MemoryStore,
    MemoryDirectory,
    RecordingNotifier,
    CourseId,
) {
    let (service, store, directory, notifier) = build_service();
    directory.insert(course(id, capacity));
    (service, store, directory, notifier, CourseId(id.to_string()))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
