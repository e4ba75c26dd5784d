//! Read-only session accessors for page rendering.
//!
//! These take the classroom read lock, so they never interleave with a
//! half-applied mutation.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::layout::{DeskId, SeatId};
use crate::services::snapshot::{self, DeskSnapshot, SeatView, SessionSnapshot};
use crate::state::{AppState, SessionError};

/// Whole classroom: phase, labels, and every desk with its seats.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let classroom = state.read().await;
    Json(snapshot::session_snapshot(&state.layout, &classroom.session))
}

pub async fn get_desk(
    State(state): State<AppState>,
    Path(desk_id): Path<DeskId>,
) -> Result<Json<DeskSnapshot>, StatusCode> {
    let classroom = state.read().await;
    snapshot::desk_snapshot(&state.layout, &classroom.session, desk_id)
        .map(Json)
        .map_err(session_error_to_status)
}

/// One seat with its desk and the class phase, as a student page shows it.
pub async fn get_seat(
    State(state): State<AppState>,
    Path((desk_id, seat_id)): Path<(DeskId, SeatId)>,
) -> Result<Json<SeatView>, StatusCode> {
    let classroom = state.read().await;
    snapshot::seat_view(&state.layout, &classroom.session, desk_id, seat_id)
        .map(Json)
        .map_err(session_error_to_status)
}

fn session_error_to_status(err: SessionError) -> StatusCode {
    match err {
        SessionError::InvalidSeatReference { .. } | SessionError::UnknownDesk(_) => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
