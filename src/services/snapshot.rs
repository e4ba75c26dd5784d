//! Read views of the session for page rendering and client re-sync.
//!
//! Snapshots pair the static layout with live seat state. Connection ids
//! never leave the server; a seat only reports whether it's occupied.

use serde::Serialize;

use crate::layout::{DeskId, DeskLayout, Layout, SeatId, StatusLabels};
use crate::state::{ClassPhase, Desk, DeskStatus, SeatStatus, Session, SessionError, seat_index};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatSnapshot {
    pub seat_id: SeatId,
    pub status: SeatStatus,
    pub name: Option<String>,
    pub occupied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskSnapshot {
    pub desk_id: DeskId,
    pub layout: DeskLayout,
    pub status: DeskStatus,
    pub seats: Vec<SeatSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: ClassPhase,
    pub room_size: u32,
    pub labels: StatusLabels,
    pub desks: Vec<DeskSnapshot>,
}

/// One seat with the context a student page needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatView {
    pub phase: ClassPhase,
    pub labels: StatusLabels,
    pub desk: DeskSnapshot,
    pub seat: SeatSnapshot,
}

#[must_use]
pub fn session_snapshot(layout: &Layout, session: &Session) -> SessionSnapshot {
    let desks = layout
        .desks()
        .filter_map(|d| session.desk(d.id).map(|desk| desk_view(d, desk)))
        .collect();
    SessionSnapshot { phase: session.phase(), room_size: layout.room_size, labels: layout.labels.clone(), desks }
}

/// # Errors
///
/// Returns `UnknownDesk` if the desk doesn't exist.
pub fn desk_snapshot(layout: &Layout, session: &Session, desk_id: DeskId) -> Result<DeskSnapshot, SessionError> {
    let (Some(desk_layout), Some(desk)) = (layout.desk(desk_id), session.desk(desk_id)) else {
        return Err(SessionError::UnknownDesk(desk_id));
    };
    Ok(desk_view(desk_layout, desk))
}

/// # Errors
///
/// Returns `InvalidSeatReference` if the desk or seat doesn't exist.
pub fn seat_view(layout: &Layout, session: &Session, desk_id: DeskId, seat_id: SeatId) -> Result<SeatView, SessionError> {
    let invalid = SessionError::InvalidSeatReference { desk_id, seat_id };
    let desk = desk_snapshot(layout, session, desk_id).map_err(|_| invalid.clone())?;
    let seat = desk.seats.get(seat_id as usize).cloned().ok_or(invalid)?;
    Ok(SeatView { phase: session.phase(), labels: layout.labels.clone(), desk, seat })
}

fn desk_view(layout: &DeskLayout, desk: &Desk) -> DeskSnapshot {
    let seats = desk
        .seats()
        .iter()
        .enumerate()
        .map(|(index, seat)| SeatSnapshot {
            seat_id: seat_index(index),
            status: seat.status,
            name: seat.occupant_name.clone(),
            occupied: seat.is_bound(),
        })
        .collect();
    DeskSnapshot { desk_id: layout.id, layout: layout.clone(), status: desk.composite(), seats }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
