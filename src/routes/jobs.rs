use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::event::TelemetryEvent;
use crate::models::job::JobStatus;
use crate::models::verdict::Verdict;
use crate::services::query::QueryError;
use crate::services::runner::RunnerError;

/// Request to submit a claim for verification.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitJobRequest {
    #[garde(length(min = 1, max = 10_000))]
    pub claim: String,
}

/// Response after submitting a claim.
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Response for querying job status.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub claim: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<TelemetryEvent>,
}

/// Response for querying a terminal job result.
#[derive(Debug, Serialize)]
pub struct JobResultResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// POST /api/v1/jobs — submit a claim for verification.
///
/// Validation happens before any job record is created; the response
/// returns as soon as the worker process is launched.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    if let Err(e) = req.validate() {
        metrics::counter!("claim_jobs_rejected").increment(1);
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("invalid request: {}", e),
        ));
    }

    match state.runner.start_job(&req.claim).await {
        Ok(job_id) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitJobResponse {
                job_id,
                status: JobStatus::Pending,
            }),
        )),
        Err(RunnerError::EmptyClaim) => {
            metrics::counter!("claim_jobs_rejected").increment(1);
            Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "claim must not be empty",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "job submission failed");
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "temporarily unavailable",
            ))
        }
    }
}

/// GET /api/v1/jobs/{job_id} — poll job status and telemetry events.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = parse_job_id(&job_id)?;

    match state.query.get_status(job_id).await {
        Ok(view) => Ok(Json(JobStatusResponse {
            job_id: view.job.id,
            status: view.job.status,
            claim: view.job.claim,
            created_at: view.job.created_at,
            completed_at: view.job.completed_at,
            error: view.job.error,
            events: view.events,
        })),
        Err(QueryError::NotFound) => Err(api_error(StatusCode::NOT_FOUND, "job not found")),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "status query failed");
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "temporarily unavailable",
            ))
        }
    }
}

/// GET /api/v1/jobs/{job_id}/result — fetch the terminal verdict.
///
/// Returns 409 while the job is still in flight; a failed job returns
/// its recorded error detail rather than a verdict.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResultResponse>, ApiError> {
    let job_id = parse_job_id(&job_id)?;

    match state.query.get_result(job_id).await {
        Ok(verdict) => Ok(Json(JobResultResponse {
            job_id,
            status: JobStatus::Completed,
            result: Some(verdict),
            error: None,
        })),
        Err(QueryError::NotFound) => Err(api_error(StatusCode::NOT_FOUND, "job not found")),
        Err(QueryError::NotReady) => Err(api_error(
            StatusCode::CONFLICT,
            "job has not reached a terminal state",
        )),
        Err(QueryError::JobFailed { error }) => Ok(Json(JobResultResponse {
            job_id,
            status: JobStatus::Failed,
            result: None,
            error: Some(error),
        })),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "result query failed");
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "temporarily unavailable",
            ))
        }
    }
}

/// A malformed id cannot name any job, so it maps to not-found rather
/// than a bad-request error.
fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| api_error(StatusCode::NOT_FOUND, "job not found"))
}
