//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        // Timer
        .route("/timer", get(timer_handler))
        .route("/widget", get(widget_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/skip", post(skip_handler))
        .route("/timer/cancel", post(cancel_handler))
        .route("/timer/reset", post(reset_handler))
        // Stores
        .route(
            "/settings",
            get(get_settings_handler)
                .put(put_settings_handler)
                .delete(reset_settings_handler),
        )
        .route(
            "/preferences",
            get(get_preferences_handler)
                .put(put_preferences_handler)
                .delete(reset_preferences_handler),
        )
        .route(
            "/ambient",
            get(get_ambient_handler)
                .put(put_ambient_handler)
                .delete(clear_ambient_handler),
        )
        // Remote sessions
        .route("/sessions/active", get(active_session_handler))
        .route("/sessions/today", get(today_sessions_handler))
        .route("/title", get(get_title_handler).put(put_title_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
