// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::TimeZone;
use proptest::prelude::*;

use super::*;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).single().unwrap_or_default()
}

fn msg(id: &str, from: (&str, &str), to: (&str, &str), minute: u32, read: bool) -> Message {
    Message {
        message_id: id.to_owned(),
        sender_id: from.0.to_owned(),
        receiver_id: to.0.to_owned(),
        sender_email: Some(from.1.to_owned()),
        receiver_email: Some(to.1.to_owned()),
        sender_name: Some(format!("name-{}", from.0)),
        receiver_name: Some(format!("name-{}", to.0)),
        content: format!("content {id}"),
        created_at: at(minute),
        read_at: read.then(|| at(minute + 1)),
    }
}

const ALICE: (&str, &str) = ("u1", "alice@x.com");
const BOB: (&str, &str) = ("u2", "bob@x.com");
const CAROL: (&str, &str) = ("u3", "carol@x.com");

#[test]
fn one_pair_collapses_to_one_row() {
    // Bob's view: Alice sent two unread messages around one he sent back.
    let log = vec![
        msg("m1", ALICE, BOB, 1, false),
        msg("m2", BOB, ALICE, 2, true),
        msg("m3", ALICE, BOB, 3, false),
    ];

    let rows = fold_conversations(&log, Some("u2"), ConversationKey::Email);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.other_user_email.as_deref(), Some("alice@x.com"));
    assert_eq!(row.other_user_id, "u1");
    assert_eq!(row.other_user_name.as_deref(), Some("name-u1"));
    assert_eq!(row.unread_count, 2);
    assert_eq!(row.last_message, "content m3");
    assert_eq!(row.last_message_time, at(3));
}

#[test]
fn newest_first_regardless_of_log_order() {
    let log = vec![
        msg("m3", CAROL, BOB, 9, false),
        msg("m1", ALICE, BOB, 1, true),
        msg("m2", BOB, ALICE, 5, false),
    ];

    let rows = fold_conversations(&log, Some("u2"), ConversationKey::Email);
    let order: Vec<_> = rows.iter().map(|r| r.other_user_id.as_str()).collect();
    assert_eq!(order, ["u3", "u1"]);
    // Bob's own unread outgoing message never counts toward his unread.
    assert_eq!(rows[1].unread_count, 0);
    assert_eq!(rows[1].last_message, "content m2");
}

#[test]
fn equal_timestamps_keep_first_seen_summary() {
    let log = vec![msg("m1", ALICE, BOB, 4, true), msg("m2", ALICE, BOB, 4, true)];
    let rows = fold_conversations(&log, Some("u2"), ConversationKey::Email);
    assert_eq!(rows[0].last_message, "content m1");
}

#[test]
fn participant_id_keying_survives_email_change() {
    let mut renamed = msg("m2", ALICE, BOB, 2, false);
    renamed.sender_email = Some("alice@new.example".to_owned());
    let log = vec![msg("m1", ALICE, BOB, 1, false), renamed];

    assert_eq!(fold_conversations(&log, Some("u2"), ConversationKey::Email).len(), 2);

    let rows = fold_conversations(&log, Some("u2"), ConversationKey::ParticipantId);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].unread_count, 2);
}

#[test]
fn empty_log_gives_empty_list() {
    assert!(fold_conversations(&[], Some("u1"), ConversationKey::Email).is_empty());
}

#[test]
fn display_name_falls_back_to_email() {
    let mut row = fold_conversations(
        &[msg("m1", ALICE, BOB, 1, true)],
        Some("u2"),
        ConversationKey::Email,
    )
    .remove(0);
    assert_eq!(row.display_name(), Some("name-u1"));
    row.other_user_name = None;
    assert_eq!(row.display_name(), Some("alice@x.com"));
}

fn arb_log() -> impl Strategy<Value = Vec<Message>> {
    let people = [ALICE, BOB, CAROL];
    proptest::collection::vec((0usize..3, 0usize..3, 0u32..50, any::<bool>()), 0..40).prop_map(
        move |rows| {
            rows.into_iter()
                .enumerate()
                .filter(|(_, (from, to, _, _))| from != to)
                .map(|(i, (from, to, minute, read))| {
                    msg(&format!("m{i}"), people[from], people[to], minute, read)
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn unread_totals_match_the_log(log in arb_log()) {
        let rows = fold_conversations(&log, Some("u2"), ConversationKey::Email);
        let expected = log.iter().filter(|m| m.is_unread_for(Some("u2"))).count() as u64;
        prop_assert_eq!(rows.iter().map(|r| r.unread_count).sum::<u64>(), expected);

        for pair in rows.windows(2) {
            prop_assert!(pair[0].last_message_time >= pair[1].last_message_time);
        }
        for row in &rows {
            let newest = log
                .iter()
                .filter(|m| m.other_participant(Some("u2")).id == row.other_user_id)
                .map(|m| m.created_at)
                .max();
            prop_assert_eq!(Some(row.last_message_time), newest);
        }
    }
}
