//! HTTP surface - Axum routes
//!
//! One quote endpoint plus an admin reset and a health probe. All quote
//! replies use the tagged envelope from [`crate::data`]: `status:
//! "success"` with the quote fields inlined, or `status: "error"` with a
//! fixed message. Degradations map to 503; only a missing credential maps
//! to 500.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::data::QuoteResponse;
use crate::service::{QuoteService, ServiceError};

/// Create the API router with all routes
pub fn create_router(service: Arc<QuoteService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/quote", get(get_quote))
        .route("/api/admin/reset-limit", post(reset_limit))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Resolve the configured symbol to a quote
async fn get_quote(
    State(service): State<Arc<QuoteService>>,
) -> (StatusCode, Json<QuoteResponse>) {
    match service.quote().await {
        Ok(quote) => (StatusCode::OK, Json(QuoteResponse::Success(quote))),
        Err(e) => error_reply(e),
    }
}

/// Maps a service error to its status code and error envelope
fn error_reply(e: ServiceError) -> (StatusCode, Json<QuoteResponse>) {
    let message = e.to_string();
    let (status, detail) = match e {
        ServiceError::Unavailable { detail, .. } => (StatusCode::SERVICE_UNAVAILABLE, detail),
        ServiceError::MissingCredential => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };
    (status, Json(QuoteResponse::Error { message, detail }))
}

/// Clear the rate limit window
async fn reset_limit(State(service): State<Arc<QuoteService>>) -> Json<serde_json::Value> {
    let cleared = service.reset_rate_limit();
    Json(serde_json::json!({
        "status": "ok",
        "cleared": cleared,
    }))
}

/// Liveness probe
async fn health(State(service): State<Arc<QuoteService>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "symbol": service.symbol(),
    }))
}
