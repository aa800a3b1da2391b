use axum::{extract::State, http::StatusCode, Json};
use jobs::JobRequest;

use crate::{routes::schedule::{JobCreated, ValidationReport}, state::AppState};
use sched_core::{validate_classes, ValidationError};
use types::ClassEnvelope;

#[utoipa::path(
    post,
    path = "/v1/classes/validate",
    request_body = ClassEnvelope,
    responses((status = 200, description = "Validation result", body = ValidationReport))
)]
pub async fn validate(Json(env): Json<ClassEnvelope>) -> (StatusCode, Json<ValidationReport>) {
    match validate_classes(&env) {
        Ok(()) => (StatusCode::OK, Json(ValidationReport { ok: true, errors: vec![] })),
        Err(ValidationError::Msg(msg)) => {
            let errs = msg
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            (StatusCode::OK, Json(ValidationReport { ok: false, errors: errs }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/classes/solve",
    request_body = ClassEnvelope,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn solve(
    State(state): State<AppState>,
    Json(env): Json<ClassEnvelope>,
) -> Json<JobCreated> {
    let id = state.jobs.enqueue(JobRequest::Classes(env));
    Json(JobCreated {
        job_id: id.0,
        status: "queued",
    })
}
