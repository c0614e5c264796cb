use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, CourseId, EnrollmentId, EnrollmentOutcome, EnrollmentRecord, EnrollmentStatus,
    RoleType, StudentId,
};
use super::repository::{
    AuthorizationPolicy, CourseDirectory, EnrollmentStore, EnrollmentView, StatusNotifier,
    StoreError,
};
use super::service::{EnrollmentError, EnrollmentService};

/// Router builder exposing the enrollment operations. Authentication happens
/// upstream; the gateway forwards the caller identity in `x-user-id` and
/// `x-user-roles` headers.
pub fn enrollment_router<S, C, P, N>(service: Arc<EnrollmentService<S, C, P, N>>) -> Router
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    Router::new()
        .route("/api/v1/enrollments", post(enroll_handler::<S, C, P, N>))
        .route(
            "/api/v1/enrollments/join",
            post(join_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/status",
            patch(update_status_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id",
            delete(withdraw_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/courses/:course_id/statistics",
            get(statistics_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/courses/:course_id/enrollments",
            get(course_enrollments_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/courses/:course_id/waitlist",
            get(waitlist_handler::<S, C, P, N>),
        )
        .route(
            "/api/v1/students/:student_id/enrollments",
            get(student_enrollments_handler::<S, C, P, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    pub(crate) course_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinRequest {
    pub(crate) access_code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusRequest {
    pub(crate) status: EnrollmentStatus,
}

pub(crate) async fn enroll_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<EnrollRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return missing_identity_response();
    };
    if let Err(err) = service.authorize_enrollment(&actor) {
        return error_response(&err);
    }

    let student_id = StudentId(actor.user_id.0.clone());
    match service.enroll(student_id, CourseId(request.course_id)) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn join_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<JoinRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return missing_identity_response();
    };
    if let Err(err) = service.authorize_enrollment(&actor) {
        return error_response(&err);
    }

    let student_id = StudentId(actor.user_id.0.clone());
    match service.join_with_access_code(student_id, &request.access_code) {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn update_status_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    headers: HeaderMap,
    Path(enrollment_id): Path<String>,
    axum::Json(request): axum::Json<UpdateStatusRequest>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return missing_identity_response();
    };

    let id = EnrollmentId(enrollment_id);
    match service.update_status(&id, request.status, &actor) {
        Ok(record) => (StatusCode::OK, axum::Json(EnrollmentView::from(&record))).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn withdraw_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    headers: HeaderMap,
    Path(enrollment_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    let Some(actor) = actor_from_headers(&headers) else {
        return missing_identity_response();
    };

    let id = EnrollmentId(enrollment_id);
    match service.withdraw(&id, &actor) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn statistics_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    Path(course_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    match service.statistics(&CourseId(course_id)) {
        Ok(statistics) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn course_enrollments_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    Path(course_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    match service.course_enrollments(&CourseId(course_id)) {
        Ok(records) => roster_response(&records),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn waitlist_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    Path(course_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    match service.waitlisted_students(&CourseId(course_id)) {
        Ok(records) => roster_response(&records),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn student_enrollments_handler<S, C, P, N>(
    State(service): State<Arc<EnrollmentService<S, C, P, N>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    match service.student_enrollments(&StudentId(student_id)) {
        Ok(records) => roster_response(&records),
        Err(err) => error_response(&err),
    }
}

fn outcome_response(outcome: EnrollmentOutcome) -> Response {
    match outcome {
        EnrollmentOutcome::Admitted(record) | EnrollmentOutcome::Waitlisted(record) => (
            StatusCode::CREATED,
            axum::Json(EnrollmentView::from(&record)),
        )
            .into_response(),
        EnrollmentOutcome::AlreadyEnrolled(record) => {
            let payload = json!({
                "error": "already enrolled in this course",
                "enrollment": EnrollmentView::from(&record),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
    }
}

fn roster_response(records: &[EnrollmentRecord]) -> Response {
    let views: Vec<EnrollmentView> = records.iter().map(EnrollmentView::from).collect();
    (StatusCode::OK, axum::Json(views)).into_response()
}

fn error_response(error: &EnrollmentError) -> Response {
    let status = match error {
        EnrollmentError::CourseNotFound
        | EnrollmentError::EnrollmentNotFound
        | EnrollmentError::InvalidAccessCode
        | EnrollmentError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        EnrollmentError::Unauthorized => StatusCode::FORBIDDEN,
        EnrollmentError::CapacityExhausted | EnrollmentError::Store(StoreError::Conflict) => {
            StatusCode::CONFLICT
        }
        EnrollmentError::CourseClosed | EnrollmentError::InvalidTransition { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EnrollmentError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        EnrollmentError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn missing_identity_response() -> Response {
    let payload = json!({ "error": "missing caller identity" });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers.get("x-user-id")?.to_str().ok()?.trim();
    if user_id.is_empty() {
        return None;
    }

    let roles = headers
        .get("x-user-roles")
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.split(',').filter_map(RoleType::from_label).collect())
        .unwrap_or_default();

    Some(Actor::new(user_id, roles))
}
