//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the immutable room layout and one lock around the live
//! classroom: the session (desks, seats, class phase) together with the
//! outbound channels of every connected client. Keeping both behind the
//! same lock lets a mutation apply, aggregate, and hand its events to
//! every client before the next mutation can observe the session.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, mpsc};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::layout::{DeskId, Layout, SeatId};

// =============================================================================
// STATUSES
// =============================================================================

/// What a single student reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    #[default]
    None,
    Working,
    NeedsHelp,
    Done,
}

impl SeatStatus {
    /// Parse the wire spelling (`none`, `working`, `needs_help`, `done`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(Self::None),
            "working" => Some(Self::Working),
            "needs_help" => Some(Self::NeedsHelp),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Desk-level status derived from the statuses of its occupied seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskStatus {
    #[default]
    Empty,
    Init,
    Working,
    NeedsHelp,
    Done,
}

/// Class-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassPhase {
    #[default]
    NotStarted,
    Lecturing,
    Working,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no seat {seat_id} at desk {desk_id}")]
    InvalidSeatReference { desk_id: DeskId, seat_id: SeatId },
    #[error("no desk {0}")]
    UnknownDesk(DeskId),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSeatReference { .. } => "E_INVALID_SEAT",
            Self::UnknownDesk(_) => "E_UNKNOWN_DESK",
        }
    }
}

// =============================================================================
// SEATS AND DESKS
// =============================================================================

/// Seat id for a position in a desk's seat list. Desks are built from a
/// `u32` seat count, so every index fits.
#[must_use]
pub fn seat_index(index: usize) -> SeatId {
    SeatId::try_from(index).unwrap_or(SeatId::MAX)
}

/// Address of one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SeatRef {
    pub desk_id: DeskId,
    pub seat_id: SeatId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seat {
    pub status: SeatStatus,
    pub occupant_name: Option<String>,
    /// Lookup key of the live connection sitting here. The connection owns
    /// its own lifecycle; this is cleared when it goes away.
    pub connection_id: Option<Uuid>,
}

impl Seat {
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.connection_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desk {
    seats: Vec<Seat>,
    composite: DeskStatus,
}

impl Desk {
    fn with_seats(count: u32) -> Self {
        Self { seats: (0..count).map(|_| Seat::default()).collect(), composite: DeskStatus::Empty }
    }

    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seats_mut(&mut self) -> &mut [Seat] {
        &mut self.seats
    }

    #[must_use]
    pub fn composite(&self) -> DeskStatus {
        self.composite
    }

    /// Store a freshly aggregated status, returning the previous one.
    /// Only the aggregation engine writes this.
    pub(crate) fn replace_composite(&mut self, status: DeskStatus) -> DeskStatus {
        std::mem::replace(&mut self.composite, status)
    }

    /// Statuses of seats with a live connection, in seat order.
    pub fn bound_statuses(&self) -> impl Iterator<Item = SeatStatus> + '_ {
        self.seats.iter().filter(|s| s.is_bound()).map(|s| s.status)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// The live classroom: every desk plus the class phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    desks: BTreeMap<DeskId, Desk>,
    phase: ClassPhase,
}

impl Session {
    /// Build an empty session with one desk per layout desk.
    #[must_use]
    pub fn new(layout: &Layout) -> Self {
        let desks = layout.desks().map(|d| (d.id, Desk::with_seats(d.seats))).collect();
        Self { desks, phase: ClassPhase::NotStarted }
    }

    #[must_use]
    pub fn phase(&self) -> ClassPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: ClassPhase) {
        self.phase = phase;
    }

    #[must_use]
    pub fn desk(&self, desk_id: DeskId) -> Option<&Desk> {
        self.desks.get(&desk_id)
    }

    /// # Errors
    ///
    /// Returns `UnknownDesk` if the desk doesn't exist.
    pub fn desk_mut(&mut self, desk_id: DeskId) -> Result<&mut Desk, SessionError> {
        self.desks.get_mut(&desk_id).ok_or(SessionError::UnknownDesk(desk_id))
    }

    /// Desks in ascending id order.
    pub fn desks(&self) -> impl Iterator<Item = (DeskId, &Desk)> {
        self.desks.iter().map(|(id, desk)| (*id, desk))
    }

    /// Desks in ascending id order, for mutations that sweep the room.
    pub(crate) fn desks_mut(&mut self) -> impl Iterator<Item = (DeskId, &mut Desk)> {
        self.desks.iter_mut().map(|(id, desk)| (*id, desk))
    }

    /// # Errors
    ///
    /// Returns `InvalidSeatReference` if the desk or seat doesn't exist.
    pub fn seat(&self, desk_id: DeskId, seat_id: SeatId) -> Result<&Seat, SessionError> {
        self.desks
            .get(&desk_id)
            .and_then(|d| d.seats.get(seat_id as usize))
            .ok_or(SessionError::InvalidSeatReference { desk_id, seat_id })
    }

    /// # Errors
    ///
    /// Returns `InvalidSeatReference` if the desk or seat doesn't exist.
    pub fn seat_mut(&mut self, desk_id: DeskId, seat_id: SeatId) -> Result<&mut Seat, SessionError> {
        self.desks
            .get_mut(&desk_id)
            .and_then(|d| d.seats.get_mut(seat_id as usize))
            .ok_or(SessionError::InvalidSeatReference { desk_id, seat_id })
    }

    /// Seats currently bound to `connection_id`, in desk/seat order.
    #[must_use]
    pub fn seats_bound_to(&self, connection_id: Uuid) -> Vec<SeatRef> {
        let mut found = Vec::new();
        for (desk_id, desk) in &self.desks {
            for (index, seat) in desk.seats.iter().enumerate() {
                if seat.connection_id == Some(connection_id) {
                    found.push(SeatRef { desk_id: *desk_id, seat_id: seat_index(index) });
                }
            }
        }
        found
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Everything guarded by the classroom lock.
pub struct Classroom {
    pub session: Session,
    /// Connected clients: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub layout: Arc<Layout>,
    classroom: Arc<RwLock<Classroom>>,
    /// Capacity of each client's outbound frame channel.
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(layout: Layout, client_channel_capacity: usize) -> Self {
        let classroom = Classroom { session: Session::new(&layout), clients: HashMap::new() };
        Self { layout: Arc::new(layout), classroom: Arc::new(RwLock::new(classroom)), client_channel_capacity }
    }

    /// Shared view for read accessors.
    pub async fn read(&self) -> RwLockReadGuard<'_, Classroom> {
        self.classroom.read().await
    }

    /// Exclusive access for one mutation. Only the services take this.
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Classroom> {
        self.classroom.write().await
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
