//! Status aggregation — a desk's composite status from its occupied seats.
//!
//! DESIGN
//! ======
//! Only seats with a live connection take part; an empty seat is invisible
//! no matter what stale status it carries. The most urgent need wins:
//!
//! 1. no occupied seat          -> `empty`
//! 2. anyone needs help         -> `needs_help`
//! 3. anyone working            -> `working`
//! 4. everyone done             -> `done`
//! 5. nobody has a status yet   -> `init`
//! 6. some done, some unstarted -> `working`
//!
//! The last rule keeps the composite a total function of the occupied
//! seats: the desk is neither finished nor waiting to start.
//!
//! Every mutation that touches a desk calls [`refresh`] exactly once before
//! its events are dispatched, so observers never see a stale composite.

use crate::layout::DeskId;
use crate::services::broadcast::Event;
use crate::state::{Desk, DeskStatus, SeatStatus, Session, SessionError};

/// Derive a composite status from the statuses of occupied seats.
#[must_use]
pub fn composite_status(bound: impl IntoIterator<Item = SeatStatus>) -> DeskStatus {
    let mut occupied = false;
    let mut needs_help = false;
    let mut working = false;
    let mut done = false;
    let mut unstarted = false;

    for status in bound {
        occupied = true;
        match status {
            SeatStatus::NeedsHelp => needs_help = true,
            SeatStatus::Working => working = true,
            SeatStatus::Done => done = true,
            SeatStatus::None => unstarted = true,
        }
    }

    if !occupied {
        DeskStatus::Empty
    } else if needs_help {
        DeskStatus::NeedsHelp
    } else if working {
        DeskStatus::Working
    } else if !unstarted {
        DeskStatus::Done
    } else if !done {
        DeskStatus::Init
    } else {
        DeskStatus::Working
    }
}

/// Recompute and store a desk's composite status.
///
/// Returns `(old, new)`; the caller decides whether the change is worth
/// announcing.
///
/// # Errors
///
/// Returns `UnknownDesk` if the desk doesn't exist.
pub fn recompute(session: &mut Session, desk_id: DeskId) -> Result<(DeskStatus, DeskStatus), SessionError> {
    Ok(recompute_desk(session.desk_mut(desk_id)?))
}

/// Recompute a desk that is already borrowed.
pub fn recompute_desk(desk: &mut Desk) -> (DeskStatus, DeskStatus) {
    let new = composite_status(desk.bound_statuses());
    let old = desk.replace_composite(new);
    (old, new)
}

/// Recompute a desk and queue a `desk:status_changed` event if it moved.
///
/// # Errors
///
/// Returns `UnknownDesk` if the desk doesn't exist.
pub fn refresh(session: &mut Session, desk_id: DeskId, events: &mut Vec<Event>) -> Result<(), SessionError> {
    refresh_desk(desk_id, session.desk_mut(desk_id)?, events);
    Ok(())
}

/// [`refresh`] for a desk the caller is already iterating.
pub fn refresh_desk(desk_id: DeskId, desk: &mut Desk, events: &mut Vec<Event>) {
    let (old, new) = recompute_desk(desk);
    if old != new {
        tracing::info!(desk_id, from = ?old, to = ?new, "desk status changed");
        events.push(Event::DeskStatusChanged { desk_id, status: new });
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
