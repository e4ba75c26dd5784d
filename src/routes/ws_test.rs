use super::*;
use crate::frame::Status;
use crate::state::test_helpers;
use crate::state::DeskStatus;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

fn text(syscall: &str, data: serde_json::Value) -> String {
    json!({ "syscall": syscall, "data": data }).to_string()
}

// =============================================================================
// INBOUND DISPATCH
// =============================================================================

#[tokio::test]
async fn invalid_json_gets_gateway_error() {
    let state = test_helpers::test_app_state();
    let (client, _rx) = test_helpers::connect_client(&state).await;

    let replies = process_inbound_text(&state, client, "{not json").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].syscall, "gateway:error");
    let message = replies[0].data.get(FRAME_MESSAGE).and_then(|v| v.as_str()).unwrap_or_default();
    assert!(message.starts_with("invalid json"));
}

#[tokio::test]
async fn unknown_syscall_is_reported_to_sender() {
    let state = test_helpers::test_app_state();
    let (client, mut rx) = test_helpers::connect_client(&state).await;

    for syscall in ["board:join", "seat:teleport", "class:recess"] {
        let replies = process_inbound_text(&state, client, &text(syscall, json!({}))).await;
        assert_eq!(replies.len(), 1, "{syscall}");
        assert_eq!(replies[0].status, Status::Error);
        assert_eq!(replies[0].syscall, syscall);
        assert_eq!(replies[0].data.get(FRAME_CODE), Some(&json!("E_UNKNOWN_SYSCALL")));
    }
    test_helpers::assert_no_frame(&mut rx).await;
}

#[tokio::test]
async fn missing_and_invalid_fields_are_reported() {
    let state = test_helpers::test_app_state();
    let (client, mut rx) = test_helpers::connect_client(&state).await;

    let replies = process_inbound_text(&state, client, &text("seat:claim", json!({ "desk_id": 0 }))).await;
    assert_eq!(replies[0].data.get(FRAME_CODE), Some(&json!("E_MISSING_FIELD")));

    let replies = process_inbound_text(
        &state,
        client,
        &text("seat:status", json!({ "desk_id": 0, "seat_id": 0, "status": "bored" })),
    )
    .await;
    assert_eq!(replies[0].data.get(FRAME_CODE), Some(&json!("E_INVALID_FIELD")));

    let replies = process_inbound_text(&state, client, &text("seat:name", json!({ "desk_id": 0, "seat_id": 0 }))).await;
    assert_eq!(replies[0].data.get(FRAME_CODE), Some(&json!("E_MISSING_FIELD")));

    test_helpers::assert_no_frame(&mut rx).await;
}

#[tokio::test]
async fn reply_points_back_at_request() {
    let state = test_helpers::test_app_state();
    let (client, _rx) = test_helpers::connect_client(&state).await;
    let id = Uuid::new_v4();
    let raw = json!({ "id": id, "syscall": "seat:claim", "data": {} }).to_string();

    let replies = process_inbound_text(&state, client, &raw).await;
    assert_eq!(replies[0].parent_id, Some(id));
}

#[tokio::test]
async fn invalid_seat_is_dropped_silently() {
    let state = test_helpers::test_app_state();
    let (client, mut rx) = test_helpers::connect_client(&state).await;
    let before = state.read().await.session.clone();

    for (desk_id, seat_id) in [(0, 4), (9, 0)] {
        let data = json!({ "desk_id": desk_id, "seat_id": seat_id, "status": "done" });
        assert!(process_inbound_text(&state, client, &text("seat:claim", data.clone())).await.is_empty());
        assert!(process_inbound_text(&state, client, &text("seat:status", data)).await.is_empty());
    }

    test_helpers::assert_no_frame(&mut rx).await;
    assert_eq!(state.read().await.session, before);
}

#[tokio::test]
async fn claim_and_status_broadcast_to_everyone() {
    let state = test_helpers::test_app_state();
    let (student, mut student_rx) = test_helpers::connect_client(&state).await;
    let (_teacher, mut teacher_rx) = test_helpers::connect_client(&state).await;

    let claim = text("seat:claim", json!({ "desk_id": "2", "seat_id": 1 }));
    assert!(process_inbound_text(&state, student, &claim).await.is_empty());
    let status = text("seat:status", json!({ "desk_id": 2, "seat_id": 1, "status": "needs_help" }));
    assert!(process_inbound_text(&state, student, &status).await.is_empty());

    let expected = vec![
        "seat:bound",
        "seat:status_changed",
        "desk:status_changed",
        "seat:status_changed",
        "desk:status_changed",
    ];
    assert_eq!(test_helpers::drain_syscalls(&mut student_rx), expected);
    let frames = test_helpers::drain(&mut teacher_rx);
    assert_eq!(frames.iter().map(|f| f.syscall.as_str()).collect::<Vec<_>>(), expected);
    assert_eq!(frames[4].data.get("status"), Some(&json!("needs_help")));

    let classroom = state.read().await;
    let seat = classroom.session.seat(2, 1).expect("seat");
    assert_eq!(seat.connection_id, Some(student));
    assert_eq!(classroom.session.desk(2).expect("desk").composite(), DeskStatus::NeedsHelp);
}

#[tokio::test]
async fn class_commands_dispatch() {
    let state = test_helpers::test_app_state();
    let (student, mut rx) = test_helpers::connect_client(&state).await;
    process_inbound_text(&state, student, &text("seat:claim", json!({ "desk_id": 0, "seat_id": 0 }))).await;
    test_helpers::drain(&mut rx);

    assert!(process_inbound_text(&state, student, &text("class:work", json!({}))).await.is_empty());
    assert_eq!(
        test_helpers::drain_syscalls(&mut rx).last().map(String::as_str),
        Some("class:work_started")
    );

    process_inbound_text(&state, student, &text("class:sweep", json!({}))).await;
    let alert = test_helpers::recv_frame(&mut rx).await;
    assert_eq!(alert.syscall, "seat:alert");
    assert_eq!(alert.data.get("status"), Some(&json!("working")));

    process_inbound_text(&state, student, &text("class:lecture", json!({}))).await;
    assert_eq!(
        test_helpers::drain_syscalls(&mut rx).last().map(String::as_str),
        Some("class:lecture_started")
    );
    assert_eq!(state.read().await.session.phase(), crate::state::ClassPhase::Lecturing);
}

#[tokio::test]
async fn name_is_broadcast() {
    let state = test_helpers::test_app_state();
    let (client, mut rx) = test_helpers::connect_client(&state).await;

    let name = text("seat:name", json!({ "desk_id": 1, "seat_id": 1, "name": "Ada" }));
    assert!(process_inbound_text(&state, client, &name).await.is_empty());

    let frame = test_helpers::recv_frame(&mut rx).await;
    assert_eq!(frame.syscall, "seat:name_changed");
    assert_eq!(frame.data.get("name"), Some(&json!("Ada")));
}

// =============================================================================
// SOCKET
// =============================================================================

async fn next_frame<S>(stream: &mut S) -> Frame
where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("socket receive timed out")
            .expect("socket closed")
            .expect("socket error");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("server frame should parse");
        }
    }
}

#[tokio::test]
async fn socket_session_claims_and_releases_on_close() {
    let state = test_helpers::test_app_state();
    let (_observer, mut observer_rx) = test_helpers::connect_client(&state).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = crate::routes::app(state.clone(), std::path::Path::new("/nonexistent/classdesk-static"));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let (socket, _) = connect_async(format!("ws://{addr}/api/ws")).await.expect("ws connect");
    let (mut sink, mut stream) = socket.split();

    let welcome = next_frame(&mut stream).await;
    assert_eq!(welcome.syscall, "session:connected");
    assert!(welcome.data.contains_key("client_id"));
    assert_eq!(welcome.data["session"]["desks"].as_array().map(Vec::len), Some(3));

    let claim = text("seat:claim", json!({ "desk_id": 1, "seat_id": 0 }));
    sink.send(WsMessage::Text(claim.into())).await.expect("send claim");
    assert_eq!(next_frame(&mut stream).await.syscall, "seat:bound");
    assert_eq!(next_frame(&mut stream).await.syscall, "seat:status_changed");
    assert_eq!(next_frame(&mut stream).await.syscall, "desk:status_changed");

    sink.send(WsMessage::Text("nope".into())).await.expect("send garbage");
    assert_eq!(next_frame(&mut stream).await.syscall, "gateway:error");

    sink.send(WsMessage::Close(None)).await.expect("send close");
    drop(sink);
    drop(stream);

    // Observer saw the claim, then the release once the socket closed.
    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(test_helpers::recv_frame(&mut observer_rx).await.syscall);
    }
    assert_eq!(
        seen,
        [
            "seat:bound",
            "seat:status_changed",
            "desk:status_changed",
            "seat:status_changed",
            "seat:disconnected",
            "desk:status_changed",
        ]
    );

    let classroom = state.read().await;
    assert!(!classroom.session.seat(1, 0).expect("seat").is_bound());
    assert_eq!(classroom.session.desk(1).expect("desk").composite(), DeskStatus::Empty);
    assert_eq!(classroom.clients.len(), 1);
}
