use axum::{
    extract::{Path, State},
    Json,
};

use crate::state::AppState;
use types::JobStatus;

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Job status", body = JobStatus))
)]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(match state.jobs.get(&id) {
        None => serde_json::json!({"status": "not_found"}),
        Some(s) => serde_json::to_value(s).unwrap(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/result",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Job outcome, once done"))
)]
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(match state.jobs.get(&id) {
        Some(JobStatus::Done { result }) => serde_json::to_value(result).unwrap(),
        Some(_) => serde_json::json!({"status": "not_ready"}),
        None => serde_json::json!({"status": "not_found"}),
    })
}
