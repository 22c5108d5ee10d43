// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{TimeZone, Utc};

use super::*;

#[test]
fn decodes_naive_backend_timestamps_as_utc() -> anyhow::Result<()> {
    let msg: Message = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "sender_id": "u1",
        "receiver_id": "u2",
        "content": "hello",
        "created_at": "2026-03-01T10:15:30.123456",
        "read_at": null,
    }))?;
    assert_eq!(msg.created_at.date_naive().to_string(), "2026-03-01");
    assert_eq!(msg.created_at.timestamp(), Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 30).unwrap().timestamp());
    assert!(msg.read_at.is_none());
    assert!(msg.sender_email.is_none());
    Ok(())
}

#[test]
fn decodes_offset_timestamps() -> anyhow::Result<()> {
    let msg: Message = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "sender_id": "u1",
        "receiver_id": "u2",
        "content": "hello",
        "created_at": "2026-03-01T12:00:00+02:00",
        "read_at": "2026-03-01T10:05:00Z",
    }))?;
    assert_eq!(msg.created_at, Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap());
    assert_eq!(msg.read_at, Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap()));
    Ok(())
}

#[test]
fn rejects_garbage_timestamps() {
    let result: Result<Message, _> = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "sender_id": "u1",
        "receiver_id": "u2",
        "content": "hello",
        "created_at": "yesterday",
    }));
    assert!(result.is_err());
}

fn message(sender: &str, receiver: &str) -> Message {
    Message {
        message_id: "m1".into(),
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        sender_email: Some(format!("{sender}@x.com")),
        receiver_email: Some(format!("{receiver}@x.com")),
        sender_name: Some(sender.to_uppercase()),
        receiver_name: Some(receiver.to_uppercase()),
        content: "hi".into(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        read_at: None,
    }
}

#[test]
fn other_participant_flips_on_direction() {
    let outgoing = message("me", "bob");
    let other = outgoing.other_participant(Some("me"));
    assert_eq!(other.id, "bob");
    assert_eq!(other.email.as_deref(), Some("bob@x.com"));

    let incoming = message("bob", "me");
    let other = incoming.other_participant(Some("me"));
    assert_eq!(other.id, "bob");
    assert_eq!(other.name.as_deref(), Some("BOB"));
}

#[test]
fn unread_only_counts_for_receiver() {
    let msg = message("bob", "me");
    assert!(msg.is_unread_for(Some("me")));
    assert!(!msg.is_unread_for(Some("bob")));
    assert!(!msg.is_unread_for(None));
}

#[test]
fn read_time_never_precedes_creation() {
    let mut msg = message("bob", "me");
    msg.mark_read_at(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap());
    assert_eq!(msg.read_at, Some(msg.created_at));
}

#[test]
fn user_full_name_skips_missing_parts() {
    let user = User { id: "u1".into(), email: None, fname: Some("Ada".into()), lname: None };
    assert_eq!(user.full_name(), "Ada");
}

#[test]
fn decoded_read_time_is_clamped_to_creation() -> anyhow::Result<()> {
    let msg: Message = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "sender_id": "u1",
        "receiver_id": "u2",
        "content": "hello",
        "created_at": "2026-03-01T10:00:00",
        "read_at": "2026-03-01T09:59:00",
    }))?;
    assert_eq!(msg.read_at, Some(msg.created_at));
    Ok(())
}
