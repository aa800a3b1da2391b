mod config;
mod error;
mod state;
mod telemetry;
pub mod routes {
    pub mod classes;
    pub mod health;
    pub mod jobs;
    pub mod schedule;
}

use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            routes::health::health,
            routes::schedule::validate,
            routes::schedule::solve,
            routes::schedule::suggest,
            routes::classes::validate,
            routes::classes::solve,
            routes::jobs::status,
            routes::jobs::result,
        ),
        components(schemas(
            types::TimeslotId, types::TeacherId, types::ParentId, types::StudentId, types::ClassId,
            types::ParentPreference, types::MeetingRequest, types::GadgetParams, types::ScheduleEnvelope,
            types::MeetingRequestRow, types::AggregatorParams, types::AggregatorEnvelope,
            types::MeetingOutcome, types::ScheduleResult, types::SuggestRequest, types::SuggestResponse,
            types::Sex, types::Student, types::ClassDef, types::GenderRatio, types::CategoricalConstraint,
            types::ClassConstraints, types::ClassEnvelope, types::Strategy, types::ClassResult,
            types::JobId, types::JobOutcome, types::JobStatus,
            routes::schedule::ValidationReport,
            routes::schedule::JobCreated,
        )),
        tags(
            (name = "schoolops", description = "Parent-teacher scheduling and class-assignment API")
        )
    )]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState::new_default();

    let app = Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/schedule/validate", post(routes::schedule::validate))
        .route("/v1/schedule/solve", post(routes::schedule::solve))
        .route("/v1/schedule/suggest", post(routes::schedule::suggest))
        .route("/v1/classes/validate", post(routes::classes::validate))
        .route("/v1/classes/solve", post(routes::classes::solve))
        .route("/v1/jobs/:id", get(routes::jobs::status))
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack())
        .with_state(app_state);

    let config = config::Config::from_env();
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", config.port)
        .parse()
        .expect("invalid listen addr");
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
