//! Classroom commands — seat updates, phase changes, and the mutation gate.
//!
//! DESIGN
//! ======
//! Each command is a plain function over `&mut Session` that returns the
//! events it caused. [`apply`] is the only way those functions run against
//! the live state: it takes the classroom write lock, runs the mutation
//! (including aggregation), and delivers the events before releasing the
//! lock. One mutation therefore completes, broadcast included, before the
//! next one starts, and a disconnect goes through the same gate as any
//! explicit command.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::frame::Frame;
use crate::layout::{DeskId, SeatId};
use crate::services::broadcast::{self, Event};
use crate::services::snapshot::{self, SessionSnapshot};
use crate::services::{aggregate, binding};
use crate::state::{AppState, ClassPhase, SeatRef, SeatStatus, Session, SessionError, seat_index};

// =============================================================================
// MUTATION GATE
// =============================================================================

/// Run one mutation under the classroom lock and deliver its events.
/// Returns how many events were produced.
///
/// # Errors
///
/// Propagates the mutation's error. A failed mutation delivers nothing.
pub async fn apply<F>(state: &AppState, mutate: F) -> Result<usize, SessionError>
where
    F: FnOnce(&mut Session) -> Result<Vec<Event>, SessionError>,
{
    let mut guard = state.write().await;
    let classroom = &mut *guard;
    let events = mutate(&mut classroom.session)?;
    broadcast::deliver(&mut classroom.clients, &events);
    Ok(events.len())
}

/// Register a connection and return the snapshot it starts from. Both
/// happen under one lock, so every later change reaches the client as an
/// event queued after the snapshot.
pub async fn connect(state: &AppState, client_id: Uuid, tx: mpsc::Sender<Frame>) -> SessionSnapshot {
    let mut classroom = state.write().await;
    classroom.clients.insert(client_id, tx);
    info!(%client_id, clients = classroom.clients.len(), "client connected");
    snapshot::session_snapshot(&state.layout, &classroom.session)
}

/// Forget a connection and release any seat it held, announcing the release
/// to everyone still connected.
pub async fn disconnect(state: &AppState, client_id: Uuid) {
    let mut classroom = state.write().await;
    classroom.clients.remove(&client_id);
    let events = binding::release_connection(&mut classroom.session, client_id);
    broadcast::deliver(&mut classroom.clients, &events);
    info!(%client_id, clients = classroom.clients.len(), released = events.len(), "client disconnected");
}

// =============================================================================
// SEAT COMMANDS
// =============================================================================

/// Overwrite a seat's status. Unbound seats accept the write, but only
/// occupied seats count toward the desk status.
///
/// # Errors
///
/// Returns `InvalidSeatReference` if the seat doesn't exist.
pub fn set_seat_status(
    session: &mut Session,
    desk_id: DeskId,
    seat_id: SeatId,
    status: SeatStatus,
) -> Result<Vec<Event>, SessionError> {
    session.seat_mut(desk_id, seat_id)?.status = status;

    let mut events = vec![Event::SeatStatusChanged { seat: SeatRef { desk_id, seat_id }, status }];
    aggregate::refresh(session, desk_id, &mut events)?;
    info!(desk_id, seat_id, ?status, "seat status set");
    Ok(events)
}

/// Overwrite the name shown for a seat's occupant.
///
/// # Errors
///
/// Returns `InvalidSeatReference` if the seat doesn't exist.
pub fn set_occupant_name(
    session: &mut Session,
    desk_id: DeskId,
    seat_id: SeatId,
    name: &str,
) -> Result<Vec<Event>, SessionError> {
    session.seat_mut(desk_id, seat_id)?.occupant_name = Some(name.to_owned());
    info!(desk_id, seat_id, name, "occupant name set");
    Ok(vec![Event::OccupantNameChanged { seat: SeatRef { desk_id, seat_id }, name: name.to_owned() }])
}

/// Alert every occupied seat that hasn't reported `done`. Touches nothing.
#[must_use]
pub fn sweep_alerts(session: &Session) -> Vec<Event> {
    let mut events = Vec::new();
    for (desk_id, desk) in session.desks() {
        for (index, seat) in desk.seats().iter().enumerate() {
            let Some(connection_id) = seat.connection_id else {
                continue;
            };
            if seat.status == SeatStatus::Done {
                continue;
            }
            let seat_ref = SeatRef { desk_id, seat_id: seat_index(index) };
            events.push(Event::Alert { connection_id, seat: seat_ref, status: seat.status });
        }
    }
    info!(alerts = events.len(), "status sweep");
    events
}

// =============================================================================
// PHASE COMMANDS
// =============================================================================

/// Clear every seat and enter the lecture phase.
pub fn start_lecture(session: &mut Session) -> Vec<Event> {
    let mut events = reset_seats(session, |_| SeatStatus::None);
    session.set_phase(ClassPhase::Lecturing);
    events.push(Event::LectureStarted(ClassPhase::Lecturing));
    info!("lecture started");
    events
}

/// Put every occupied seat to work, clear the empty ones, and enter the
/// working phase.
pub fn start_work(session: &mut Session) -> Vec<Event> {
    let mut events =
        reset_seats(session, |bound| if bound { SeatStatus::Working } else { SeatStatus::None });
    session.set_phase(ClassPhase::Working);
    events.push(Event::WorkStarted(ClassPhase::Working));
    info!("work started");
    events
}

/// Assign every seat a status based on whether it's occupied. Each desk
/// announces its seats and then its new composite before the next desk.
fn reset_seats(session: &mut Session, status_for: impl Fn(bool) -> SeatStatus) -> Vec<Event> {
    let mut events = Vec::new();
    for (desk_id, desk) in session.desks_mut() {
        for (index, seat) in desk.seats_mut().iter_mut().enumerate() {
            seat.status = status_for(seat.is_bound());
            let seat_ref = SeatRef { desk_id, seat_id: seat_index(index) };
            events.push(Event::SeatStatusChanged { seat: seat_ref, status: seat.status });
        }
        aggregate::refresh_desk(desk_id, desk, &mut events);
    }
    events
}

#[cfg(test)]
#[path = "classroom_test.rs"]
mod tests;
