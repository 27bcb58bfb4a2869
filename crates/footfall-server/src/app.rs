use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    routes,
    security::{cors_layer, security_headers},
    state::AppState,
};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer`: structured request/response logging via `tracing`.
/// 2. Security headers on every response, preflights and errors included.
/// 3. `CorsLayer`: answers `OPTIONS` preflights for allow-listed origins.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/visitors",
            get(routes::visitors::track).post(routes::visitors::action),
        )
        .route(
            "/api/cron/reset-daily",
            get(routes::cron::reset_daily).post(routes::cron::reset_daily),
        )
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
