use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("seat:claim", Data::new());
    assert_eq!(frame.syscall, "seat:claim");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("seat:status", Data::new());
    assert_eq!(frame.prefix(), "seat");
    assert_eq!(frame.op(), "status");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn minimal_inbound_frame_parses() {
    let frame: Frame =
        serde_json::from_str(r#"{"syscall":"seat:claim","data":{"desk_id":0,"seat_id":"2"}}"#).expect("parse");
    assert_eq!(frame.status, Status::Request);
    assert_eq!(frame.u32_field("desk_id"), Ok(0));
    assert_eq!(frame.u32_field("seat_id"), Ok(2));
    assert!(frame.ts > 0);
}

#[test]
fn frame_without_data_parses_with_empty_map() {
    let frame: Frame = serde_json::from_str(r#"{"syscall":"class:sweep"}"#).expect("parse");
    assert!(frame.data.is_empty());
}

#[test]
fn u32_field_rejects_negative_and_missing() {
    let frame = Frame::request("seat:claim", Data::new()).with_data("desk_id", -1);
    assert!(matches!(frame.u32_field("desk_id"), Err(FrameError::InvalidField { field: "desk_id", .. })));
    assert_eq!(frame.u32_field("seat_id"), Err(FrameError::MissingField("seat_id")));
}

#[test]
fn str_field_rejects_non_string() {
    let frame = Frame::request("seat:name", Data::new()).with_data("name", 7);
    assert!(matches!(frame.str_field("name"), Err(FrameError::InvalidField { field: "name", .. })));
}

#[test]
fn error_from_typed() {
    let req = Frame::request("seat:bogus", Data::new());
    let err = req.error_from(&FrameError::UnknownSyscall("seat:bogus".into()));

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.parent_id, Some(req.id));
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_UNKNOWN_SYSCALL"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("unknown syscall: seat:bogus"));
}
