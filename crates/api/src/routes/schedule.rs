use axum::{extract::State, http::StatusCode, Json};
use jobs::JobRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};
use sched_core::{validate_schedule, ValidationError};
use types::{AggregatorEnvelope, ScheduleEnvelope, SuggestRequest, SuggestResponse};

#[derive(Serialize, ToSchema)]
pub struct ValidationReport {
    pub ok: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct JobCreated {
    pub job_id: String,
    pub status: &'static str,
}

/// `/v1/schedule/solve` accepts either the gadget form (`parent_preferences`
/// present) or the aggregator form (`meeting_requests` present); the two
/// are structurally distinct so `serde(untagged)` picks the right one.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ScheduleSolveRequest {
    Gadget(ScheduleEnvelope),
    Aggregator(AggregatorEnvelope),
}

#[utoipa::path(
    post,
    path = "/v1/schedule/validate",
    request_body = ScheduleEnvelope,
    responses((status = 200, description = "Validation result", body = ValidationReport))
)]
pub async fn validate(
    Json(env): Json<ScheduleEnvelope>,
) -> (StatusCode, Json<ValidationReport>) {
    match validate_schedule(&env) {
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
    path = "/v1/schedule/solve",
    request_body = ScheduleEnvelope,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn solve(
    State(state): State<AppState>,
    Json(req): Json<ScheduleSolveRequest>,
) -> Json<JobCreated> {
    let request = match req {
        ScheduleSolveRequest::Gadget(env) => JobRequest::Schedule(env),
        ScheduleSolveRequest::Aggregator(env) => JobRequest::Aggregator(env),
    };
    let id = state.jobs.enqueue(request);
    Json(JobCreated {
        job_id: id.0,
        status: "queued",
    })
}

#[utoipa::path(
    post,
    path = "/v1/schedule/suggest",
    request_body = SuggestRequest,
    responses((status = 200, description = "Feasible alternative slots", body = SuggestResponse))
)]
pub async fn suggest(
    Json(req): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let resp = solver_flow::suggest_single(req)
        .await
        .map_err(|e| ApiError(e.to_string()))?;
    Ok(Json(resp))
}
