use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::routes::jobs::ErrorResponse;
use crate::services::stats::StatsSnapshot;

/// GET /api/v1/stats — aggregate job statistics.
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    match state.stats.get_stats().await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            tracing::error!(error = %e, "stats query failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "temporarily unavailable".to_string(),
                }),
            ))
        }
    }
}
