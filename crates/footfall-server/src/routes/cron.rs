use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use footfall_core::{auth::is_authorized, visitor::ResetSummary};

use crate::routes::header_str;
use crate::{error::AppError, reset, state::AppState};

/// `POST|GET /api/cron/reset-daily`: run the daily reset.
///
/// Meant for an external scheduler firing at 00:00 IST. Requires
/// `Authorization: Bearer <FOOTFALL_CRON_SECRET>`; without a configured
/// secret every call is rejected. Sub-step failures do not change the status
/// code; they are listed in `data.failedSteps`.
#[tracing::instrument(skip_all)]
pub async fn reset_daily(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let authorization = header_str(&headers, header::AUTHORIZATION);
    if !is_authorized(state.config.cron_secret.as_deref(), authorization) {
        tracing::warn!("Rejected daily reset: bad or missing bearer token");
        return Err(AppError::Unauthorized);
    }

    let summary =
        reset::run_daily_reset(state.store.as_ref(), Utc::now(), state.config.retention_days)
            .await;
    Ok(reset_response(summary))
}

pub(crate) fn reset_response(summary: ResetSummary) -> Response {
    let message = if summary.failed_steps.is_empty() {
        "Daily reset completed successfully"
    } else {
        "Daily reset completed with errors"
    };
    Json(json!({
        "success": summary.failed_steps.is_empty(),
        "message": message,
        "data": summary,
    }))
    .into_response()
}
