use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use campus_enroll::workflows::enrollment::{
    enrollment_router, AuthorizationPolicy, CourseDirectory, EnrollmentService, EnrollmentStore,
    StatusNotifier,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_enrollment_routes<S, C, P, N>(
    service: Arc<EnrollmentService<S, C, P, N>>,
) -> axum::Router
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    enrollment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "campus-enroll-api" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
