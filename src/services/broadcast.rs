//! Broadcast dispatcher — turns session events into frames for clients.
//!
//! DESIGN
//! ======
//! Mutations never talk to sockets. They return a list of [`Event`]s in the
//! order the changes happened, and [`deliver`] fans each one out while the
//! caller still holds the classroom lock. Delivery is `try_send` into each
//! client's bounded channel, so a slow client can't stall a mutation and
//! every client sees one producer's events in emission order.
//!
//! A full channel means the client has fallen behind. It is evicted rather
//! than left with a gap: its socket closes, and on reconnect it starts again
//! from a fresh `session:connected` snapshot. Other clients are unaffected.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::layout::DeskId;
use crate::state::{ClassPhase, DeskStatus, SeatRef, SeatStatus};

// =============================================================================
// EVENTS
// =============================================================================

/// One observable change to the classroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SeatBound(SeatRef),
    SeatStatusChanged { seat: SeatRef, status: SeatStatus },
    OccupantNameChanged { seat: SeatRef, name: String },
    SeatDisconnected(SeatRef),
    DeskStatusChanged { desk_id: DeskId, status: DeskStatus },
    LectureStarted(ClassPhase),
    WorkStarted(ClassPhase),
    /// Nudge for a single student who hasn't reported `done`.
    Alert { connection_id: Uuid, seat: SeatRef, status: SeatStatus },
}

/// Who receives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Everyone,
    Client(Uuid),
}

impl Event {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::SeatBound(_) => "seat:bound",
            Self::SeatStatusChanged { .. } => "seat:status_changed",
            Self::OccupantNameChanged { .. } => "seat:name_changed",
            Self::SeatDisconnected(_) => "seat:disconnected",
            Self::DeskStatusChanged { .. } => "desk:status_changed",
            Self::LectureStarted(_) => "class:lecture_started",
            Self::WorkStarted(_) => "class:work_started",
            Self::Alert { .. } => "seat:alert",
        }
    }

    #[must_use]
    pub fn recipient(&self) -> Recipient {
        match self {
            Self::Alert { connection_id, .. } => Recipient::Client(*connection_id),
            _ => Recipient::Everyone,
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let mut data = Data::new();
        match self {
            Self::SeatBound(seat) | Self::SeatDisconnected(seat) => {
                insert_seat(&mut data, *seat);
            }
            Self::SeatStatusChanged { seat, status } | Self::Alert { seat, status, .. } => {
                insert_seat(&mut data, *seat);
                data.insert("status".into(), serde_json::json!(status));
            }
            Self::OccupantNameChanged { seat, name } => {
                insert_seat(&mut data, *seat);
                data.insert("name".into(), serde_json::json!(name));
            }
            Self::DeskStatusChanged { desk_id, status } => {
                data.insert("desk_id".into(), serde_json::json!(desk_id));
                data.insert("status".into(), serde_json::json!(status));
            }
            Self::LectureStarted(phase) | Self::WorkStarted(phase) => {
                data.insert("phase".into(), serde_json::json!(phase));
            }
        }
        Frame::request(self.syscall(), data)
    }
}

fn insert_seat(data: &mut Data, seat: SeatRef) {
    data.insert("desk_id".into(), serde_json::json!(seat.desk_id));
    data.insert("seat_id".into(), serde_json::json!(seat.seat_id));
}

// =============================================================================
// DELIVERY
// =============================================================================

/// Fan events out to connected clients, in order.
///
/// A client whose channel is full or closed is removed from `clients`. Its
/// sender is dropped with it, so the socket task sees the channel close once
/// it has drained what was queued, and ends the connection. Returns the
/// removed client ids.
pub fn deliver(clients: &mut HashMap<Uuid, mpsc::Sender<Frame>>, events: &[Event]) -> Vec<Uuid> {
    let mut evicted = Vec::new();
    for event in events {
        let frame = event.to_frame();
        match event.recipient() {
            Recipient::Everyone => clients.retain(|client_id, tx| {
                let kept = send(*client_id, tx, frame.clone());
                if !kept {
                    evicted.push(*client_id);
                }
                kept
            }),
            Recipient::Client(client_id) => {
                let Some(tx) = clients.get(&client_id) else {
                    debug!(%client_id, syscall = %frame.syscall, "direct frame for unknown client dropped");
                    continue;
                };
                if !send(client_id, tx, frame) {
                    clients.remove(&client_id);
                    evicted.push(client_id);
                }
            }
        }
    }
    evicted
}

/// Queue one frame. Returns false when the client can't keep up or is gone.
fn send(client_id: Uuid, tx: &mpsc::Sender<Frame>, frame: Frame) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            warn!(%client_id, syscall = %frame.syscall, "client lagging, evicting");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(%client_id, "client channel closed, evicting");
            false
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
