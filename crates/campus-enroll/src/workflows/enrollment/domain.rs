use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for enrollment records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnrollmentId(pub String);

/// Identifier wrapper for students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for courses (owned by the external course catalog).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// Identifier wrapper for platform users (students, teachers, admins).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an enrollment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Waitlisted,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Waitlisted => "waitlisted",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of the referenced course; only `Completed` courses refuse new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Planned,
    Active,
    Completed,
}

impl CourseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CourseStatus::Planned => "planned",
            CourseStatus::Active => "active",
            CourseStatus::Completed => "completed",
        }
    }
}

/// Roles recognized by the external policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Admin,
    Teacher,
    Student,
    Parent,
    Guest,
}

impl RoleType {
    pub const fn label(self) -> &'static str {
        match self {
            RoleType::Admin => "admin",
            RoleType::Teacher => "teacher",
            RoleType::Student => "student",
            RoleType::Parent => "parent",
            RoleType::Guest => "guest",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(RoleType::Admin),
            "teacher" => Some(RoleType::Teacher),
            "student" => Some(RoleType::Student),
            "parent" => Some(RoleType::Parent),
            "guest" => Some(RoleType::Guest),
            _ => None,
        }
    }
}

/// Identity of the caller as supplied by the external auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub roles: Vec<RoleType>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, roles: Vec<RoleType>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            roles,
        }
    }

    pub fn is_student(&self, student_id: &StudentId) -> bool {
        self.user_id.0 == student_id.0
    }
}

/// Point-in-time description of a course as read from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub id: CourseId,
    pub name: String,
    pub teacher_id: UserId,
    pub capacity: u32,
    pub status: CourseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
}

impl CourseSnapshot {
    pub fn accepts_requests(&self) -> bool {
        self.status != CourseStatus::Completed
    }
}

/// A student's enrollment row, unique per (student, course) while it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    pub fn new(
        id: EnrollmentId,
        student_id: StudentId,
        course_id: CourseId,
        status: EnrollmentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            course_id,
            status,
            enrolled_at: now,
            updated_at: now,
        }
    }
}

/// Result of an admission attempt through the capacity guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Admitted(EnrollmentRecord),
    Waitlisted(EnrollmentRecord),
    AlreadyEnrolled(EnrollmentRecord),
}

impl EnrollmentOutcome {
    pub fn record(&self) -> &EnrollmentRecord {
        match self {
            EnrollmentOutcome::Admitted(record)
            | EnrollmentOutcome::Waitlisted(record)
            | EnrollmentOutcome::AlreadyEnrolled(record) => record,
        }
    }
}

/// Derived per-course counts; a point-in-time snapshot, never locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStatistics {
    pub total: u32,
    pub approved: u32,
    pub pending: u32,
    pub waitlisted: u32,
    pub available_slots: u32,
}

/// Committed status transition handed to the external notification system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub old_status: EnrollmentStatus,
    pub new_status: EnrollmentStatus,
}
