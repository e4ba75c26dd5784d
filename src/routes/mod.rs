//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the classroom websocket and the read-only session API
//! under a single Axum router. Anything else falls through to the static
//! asset directory, which holds the student and teacher pages.

pub mod session;
pub mod ws;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes used by the pages and websocket clients.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session", get(session::get_session))
        .route("/api/desks/{desk_id}", get(session::get_desk))
        .route("/api/desks/{desk_id}/seats/{seat_id}", get(session::get_seat))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application: API routes plus static pages from `static_dir`.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir).append_index_html_on_directories(true);

    api_routes(state)
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
