//! WebSocket handler — classroom frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Frames queued by the broadcast dispatcher → forward to client
//!
//! Handlers translate a frame into one classroom service call. The service
//! applies the mutation and broadcasts under the classroom lock; the
//! handler only reports problems back to the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register client, send `session:connected` with a snapshot
//! 2. Client sends frames → dispatch → service mutates + broadcasts
//! 3. Close → release the client's seat through the same service gate
//! 4. Evicted for lagging → outbound channel closes → same as close

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, FRAME_CODE, FRAME_MESSAGE, Frame, FrameError, Status};
use crate::layout::{DeskId, SeatId};
use crate::services::{binding, classroom};
use crate::state::{AppState, SeatStatus, SessionError};

// =============================================================================
// REJECTION
// =============================================================================

/// Why a frame didn't change anything.
#[derive(Debug)]
enum Rejection {
    /// The frame itself was wrong. The sender gets an error frame.
    Malformed(FrameError),
    /// The frame named a seat that doesn't exist. Dropped silently.
    Ignored(SessionError),
}

impl From<FrameError> for Rejection {
    fn from(e: FrameError) -> Self {
        Self::Malformed(e)
    }
}

impl From<SessionError> for Rejection {
    fn from(e: SessionError) -> Self {
        Self::Ignored(e)
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames from the broadcast dispatcher.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.client_channel_capacity);

    let snapshot = classroom::connect(&state, client_id, client_tx).await;
    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("session", serde_json::to_value(&snapshot).unwrap_or_default());
    if send_frame(&mut socket, &welcome).await.is_ok() {
        info!(%client_id, "ws: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(msg) = msg else { break };
                    let Ok(msg) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            for frame in process_inbound_text(&state, client_id, &text).await {
                                let _ = send_frame(&mut socket, &frame).await;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                frame = client_rx.recv() => {
                    // Sender gone: the dispatcher evicted this client for lagging.
                    let Some(frame) = frame else {
                        warn!(%client_id, "ws: evicted, closing so the client re-syncs");
                        break;
                    };
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    classroom::disconnect(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Broadcasts happen inside the services; what comes back here is only ever
/// addressed to the sender.
async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data(FRAME_MESSAGE, format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the connection as `from`.
    req.from = Some(client_id.to_string());
    info!(%client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let result = match req.prefix() {
        "seat" => handle_seat(state, client_id, &req).await,
        "class" => handle_class(state, &req).await,
        _ => Err(FrameError::UnknownSyscall(req.syscall.clone()).into()),
    };

    match result {
        Ok(()) => vec![],
        Err(Rejection::Malformed(e)) => {
            warn!(%client_id, syscall = %req.syscall, code = e.error_code(), error = %e, "ws: rejected frame");
            vec![req.error_from(&e)]
        }
        Err(Rejection::Ignored(e)) => {
            warn!(%client_id, syscall = %req.syscall, code = e.error_code(), error = %e, "ws: dropped frame");
            vec![]
        }
    }
}

// =============================================================================
// SEAT HANDLERS
// =============================================================================

async fn handle_seat(state: &AppState, client_id: Uuid, req: &Frame) -> Result<(), Rejection> {
    match req.op() {
        "claim" => {
            let (desk_id, seat_id) = seat_address(req)?;
            classroom::apply(state, |s| binding::claim_seat(s, client_id, desk_id, seat_id)).await?;
        }
        "name" => {
            let (desk_id, seat_id) = seat_address(req)?;
            let name = req.str_field("name")?;
            classroom::apply(state, |s| classroom::set_occupant_name(s, desk_id, seat_id, name)).await?;
        }
        "status" => {
            let (desk_id, seat_id) = seat_address(req)?;
            let raw = req.str_field("status")?;
            let status = SeatStatus::parse(raw)
                .ok_or_else(|| FrameError::InvalidField { field: "status", reason: format!("unknown status {raw:?}") })?;
            classroom::apply(state, |s| classroom::set_seat_status(s, desk_id, seat_id, status)).await?;
        }
        _ => return Err(FrameError::UnknownSyscall(req.syscall.clone()).into()),
    }
    Ok(())
}

fn seat_address(req: &Frame) -> Result<(DeskId, SeatId), FrameError> {
    Ok((req.u32_field("desk_id")?, req.u32_field("seat_id")?))
}

// =============================================================================
// CLASS HANDLERS
// =============================================================================

async fn handle_class(state: &AppState, req: &Frame) -> Result<(), Rejection> {
    match req.op() {
        "sweep" => classroom::apply(state, |s| Ok(classroom::sweep_alerts(s))).await?,
        "lecture" => classroom::apply(state, |s| Ok(classroom::start_lecture(s))).await?,
        "work" => classroom::apply(state, |s| Ok(classroom::start_work(s))).await?,
        _ => return Err(FrameError::UnknownSyscall(req.syscall.clone()).into()),
    };
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame
            .data
            .get(FRAME_CODE)
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, "ws: send frame status=Error");
    } else {
        debug!(id = %frame.id, syscall = %frame.syscall, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
