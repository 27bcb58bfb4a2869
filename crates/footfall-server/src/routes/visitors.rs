use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use footfall_core::{
    auth::is_authorized,
    error::CoreError,
    ip::is_valid_ip,
    sanitize::{validate_action, Action},
};

use crate::routes::{client_ip, cron::reset_response, header_str, MaybeConnectInfo};
use crate::{error::AppError, reset, state::AppState, tracking};

/// Rate-limit key suffix shared by every `/api/visitors` method.
const ENDPOINT: &str = "visitors";

#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    pub path: Option<String>,
}

/// `GET /api/visitors`: record a visit and return the day's stats.
///
/// ## Responses
/// - `200` `{ totalVisits, uniqueVisitsToday, isNewVisitorToday, date }`
/// - `400` when no valid client IP can be determined
/// - `429` with `Retry-After` once the per-IP window is exhausted
/// - `500` when today's aggregate row can be neither read nor created
#[tracing::instrument(skip_all)]
pub async fn track(
    State(state): State<Arc<AppState>>,
    connect_info: MaybeConnectInfo,
    headers: HeaderMap,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    // A malformed query string only costs the page path, never the visit.
    let page_path = match query {
        Ok(Query(query)) => query.path,
        Err(e) => {
            tracing::debug!(error = %e, "Unparsable tracking query, using default path");
            None
        }
    };

    let ip = client_ip(&state.config, &headers, connect_info.0);
    if !is_valid_ip(&ip) {
        return Err(AppError::BadRequest(
            "Unable to determine client IP".to_string(),
        ));
    }

    let remaining = state.enforce_rate_limit(&ip, ENDPOINT).await?;

    let visit = tracking::VisitContext {
        ip,
        user_agent: header_str(&headers, header::USER_AGENT)
            .unwrap_or_default()
            .to_string(),
        referer: header_str(&headers, header::REFERER)
            .unwrap_or_default()
            .to_string(),
        page_path: page_path.unwrap_or_else(|| "/".to_string()),
    };

    let stats = tracking::track_visit(state.store.as_ref(), &visit, Utc::now()).await?;

    Ok(with_remaining(Json(stats).into_response(), remaining))
}

/// `POST /api/visitors`: `{ "action": "reset-daily" | "get-stats" }`.
///
/// `reset-daily` requires `Authorization: Bearer <cron secret>`; `get-stats`
/// is public and rate limited like tracking.
#[tracing::instrument(skip_all)]
pub async fn action(
    State(state): State<Arc<AppState>>,
    connect_info: MaybeConnectInfo,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))?;

    let action = validate_action(body.get("action")).map_err(|e| match e {
        CoreError::MissingAction => AppError::BadRequest("Missing action".to_string()),
        CoreError::InvalidAction(_) => AppError::InvalidAction,
    })?;
    tracing::info!(action = action.as_str(), "Visitor action requested");

    match action {
        Action::ResetDaily => {
            let authorization = header_str(&headers, header::AUTHORIZATION);
            if !is_authorized(state.config.cron_secret.as_deref(), authorization) {
                return Err(AppError::Unauthorized);
            }
            let summary = reset::run_daily_reset(
                state.store.as_ref(),
                Utc::now(),
                state.config.retention_days,
            )
            .await;
            Ok(reset_response(summary))
        }
        Action::GetStats => {
            let ip = client_ip(&state.config, &headers, connect_info.0);
            if !is_valid_ip(&ip) {
                return Err(AppError::BadRequest(
                    "Unable to determine client IP".to_string(),
                ));
            }
            let remaining = state.enforce_rate_limit(&ip, ENDPOINT).await?;
            let stats = tracking::current_stats(state.store.as_ref(), Utc::now()).await?;
            Ok(with_remaining(Json(stats).into_response(), remaining))
        }
    }
}

fn with_remaining(mut response: Response, remaining: u32) -> Response {
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        response.headers_mut().insert("x-ratelimit-remaining", value);
    }
    response
}
