use super::*;
use crate::layout::Layout;

#[test]
fn new_session_mirrors_layout() {
    let layout = Layout::default_classroom();
    let session = Session::new(&layout);

    assert_eq!(session.phase(), ClassPhase::NotStarted);
    assert_eq!(session.desks().count(), 3);
    assert_eq!(session.desk(0).map(|d| d.seats().len()), Some(4));
    assert_eq!(session.desk(2).map(|d| d.seats().len()), Some(2));
    for (_, desk) in session.desks() {
        assert_eq!(desk.composite(), DeskStatus::Empty);
        assert!(desk.seats().iter().all(|s| *s == Seat::default()));
    }
}

#[test]
fn seat_lookup_rejects_unknown_desk_and_seat() {
    let mut session = Session::new(&Layout::default_classroom());

    assert!(session.seat(0, 3).is_ok());
    assert_eq!(session.seat(0, 4), Err(SessionError::InvalidSeatReference { desk_id: 0, seat_id: 4 }));
    assert_eq!(session.seat(9, 0), Err(SessionError::InvalidSeatReference { desk_id: 9, seat_id: 0 }));
    assert!(session.seat_mut(1, 2).is_err());
    assert_eq!(session.desk_mut(9).unwrap_err(), SessionError::UnknownDesk(9));
}

#[test]
fn bound_statuses_skip_empty_seats() {
    let mut session = Session::new(&Layout::default_classroom());
    test_helpers::bind(&mut session, 0, 1, SeatStatus::Done);
    session.seat_mut(0, 2).unwrap().status = SeatStatus::NeedsHelp;

    let desk = session.desk(0).unwrap();
    let bound: Vec<SeatStatus> = desk.bound_statuses().collect();
    assert_eq!(bound, vec![SeatStatus::Done]);
}

#[test]
fn seats_bound_to_scans_every_desk() {
    let mut session = Session::new(&Layout::default_classroom());
    let conn = test_helpers::bind(&mut session, 2, 1, SeatStatus::None);
    session.seat_mut(0, 3).unwrap().connection_id = Some(conn);

    assert_eq!(
        session.seats_bound_to(conn),
        vec![SeatRef { desk_id: 0, seat_id: 3 }, SeatRef { desk_id: 2, seat_id: 1 }]
    );
    assert!(session.seats_bound_to(Uuid::new_v4()).is_empty());
}

#[test]
fn seat_status_parses_wire_spelling() {
    assert_eq!(SeatStatus::parse("needs_help"), Some(SeatStatus::NeedsHelp));
    assert_eq!(SeatStatus::parse("none"), Some(SeatStatus::None));
    assert_eq!(SeatStatus::parse("help"), None);
    assert_eq!(serde_json::to_value(SeatStatus::NeedsHelp).unwrap(), "needs_help");
}

#[test]
fn enums_serialize_snake_case() {
    assert_eq!(serde_json::to_value(DeskStatus::NeedsHelp).unwrap(), "needs_help");
    assert_eq!(serde_json::to_value(ClassPhase::NotStarted).unwrap(), "not_started");
}

#[test]
fn session_error_codes_are_stable() {
    assert_eq!(SessionError::InvalidSeatReference { desk_id: 1, seat_id: 5 }.error_code(), "E_INVALID_SEAT");
    assert_eq!(SessionError::UnknownDesk(4).error_code(), "E_UNKNOWN_DESK");
}

#[tokio::test]
async fn app_state_starts_with_no_clients() {
    let state = test_helpers::test_app_state();
    let classroom = state.read().await;
    assert!(classroom.clients.is_empty());
    assert_eq!(classroom.session, Session::new(&state.layout));
}
