//! Connection binding — which live connection sits in which seat.
//!
//! DESIGN
//! ======
//! A seat stores only the id of the connection bound to it; the socket task
//! owns the connection itself. Claiming a seat overwrites whatever was bound
//! there before (last writer wins) and resets its status. A connection holds
//! at most one seat, so claiming moves it out of any seat it held before.
//!
//! Releasing scans the whole session rather than trusting that invariant,
//! clearing status and name on every seat still pointing at the connection.

use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use crate::layout::{DeskId, SeatId};
use crate::services::aggregate;
use crate::services::broadcast::Event;
use crate::state::{Desk, Seat, SeatRef, SeatStatus, Session, SessionError, seat_index};

/// Bind `connection_id` to a seat.
///
/// Emits `seat:bound` and a reset `seat:status_changed`, preceded by the
/// release events of any other seat the connection held, followed by desk
/// status changes.
///
/// # Errors
///
/// Returns `InvalidSeatReference` if the seat doesn't exist. Nothing is
/// mutated in that case.
pub fn claim_seat(
    session: &mut Session,
    connection_id: Uuid,
    desk_id: DeskId,
    seat_id: SeatId,
) -> Result<Vec<Event>, SessionError> {
    session.seat(desk_id, seat_id)?;

    let target = SeatRef { desk_id, seat_id };
    let mut events = Vec::new();
    let mut touched = BTreeSet::from([desk_id]);

    for previous in session.seats_bound_to(connection_id) {
        if previous == target {
            continue;
        }
        clear_seat(session.seat_mut(previous.desk_id, previous.seat_id)?);
        events.push(Event::SeatStatusChanged { seat: previous, status: SeatStatus::None });
        events.push(Event::SeatDisconnected(previous));
        touched.insert(previous.desk_id);
        info!(%connection_id, desk_id = previous.desk_id, seat_id = previous.seat_id, "seat vacated by move");
    }

    let seat = session.seat_mut(desk_id, seat_id)?;
    if let Some(displaced) = seat.connection_id.filter(|id| *id != connection_id) {
        info!(%displaced, %connection_id, desk_id, seat_id, "seat taken over by new connection");
    }
    seat.connection_id = Some(connection_id);
    seat.status = SeatStatus::None;

    events.push(Event::SeatBound(target));
    events.push(Event::SeatStatusChanged { seat: target, status: SeatStatus::None });
    for desk in touched {
        aggregate::refresh(session, desk, &mut events)?;
    }

    info!(%connection_id, desk_id, seat_id, "seat claimed");
    Ok(events)
}

/// Drop every binding held by `connection_id`, clearing status and name.
/// Returns the seats that were released.
pub fn unbind_connection(session: &mut Session, connection_id: Uuid) -> Vec<SeatRef> {
    session
        .desks_mut()
        .flat_map(|(desk_id, desk)| unbind_at_desk(desk_id, desk, connection_id))
        .collect()
}

/// Release a departed connection and describe the fallout.
///
/// A connection without a seat leaves the session untouched and yields no
/// events.
pub fn release_connection(session: &mut Session, connection_id: Uuid) -> Vec<Event> {
    let mut events = Vec::new();
    for (desk_id, desk) in session.desks_mut() {
        let released = unbind_at_desk(desk_id, desk, connection_id);
        if released.is_empty() {
            continue;
        }
        for seat in released {
            events.push(Event::SeatStatusChanged { seat, status: SeatStatus::None });
            events.push(Event::SeatDisconnected(seat));
            info!(%connection_id, desk_id, seat_id = seat.seat_id, "seat released");
        }
        aggregate::refresh_desk(desk_id, desk, &mut events);
    }
    events
}

fn unbind_at_desk(desk_id: DeskId, desk: &mut Desk, connection_id: Uuid) -> Vec<SeatRef> {
    let mut released = Vec::new();
    for (index, seat) in desk.seats_mut().iter_mut().enumerate() {
        if seat.connection_id == Some(connection_id) {
            clear_seat(seat);
            released.push(SeatRef { desk_id, seat_id: seat_index(index) });
        }
    }
    released
}

fn clear_seat(seat: &mut Seat) {
    seat.connection_id = None;
    seat.status = SeatStatus::None;
    seat.occupant_name = None;
}

#[cfg(test)]
#[path = "binding_test.rs"]
mod tests;
