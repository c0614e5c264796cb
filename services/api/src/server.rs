use crate::cli::ServeArgs;
use crate::infra::{
    seed_demo_courses, AppState, DirectoryAuthorizationPolicy, InMemoryCourseDirectory,
    InMemoryEnrollmentStore, LoggingStatusNotifier,
};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_enroll::config::AppConfig;
use campus_enroll::error::AppError;
use campus_enroll::telemetry;
use campus_enroll::workflows::enrollment::EnrollmentService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryEnrollmentStore::default());
    let directory = InMemoryCourseDirectory::default();
    if let Some(path) = args.catalog.take() {
        for course in crate::infra::load_catalog(&path)? {
            directory.insert(course);
        }
        info!(catalog = %path.display(), courses = directory.len(), "course catalog loaded");
    } else {
        seed_demo_courses(&directory);
    }

    let policy = Arc::new(DirectoryAuthorizationPolicy::new(directory.clone()));
    let notifier = Arc::new(LoggingStatusNotifier);
    let enrollment_service = Arc::new(EnrollmentService::new(
        store,
        Arc::new(directory),
        policy,
        notifier,
        config.enrollment.clone(),
    ));

    let app = with_enrollment_routes(enrollment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
