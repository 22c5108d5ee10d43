// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::Mutex;
use serde_json::json;

use super::*;

fn all_commands() -> Vec<OutboundCommand> {
    vec![
        OutboundCommand::SendMessage {
            receiver_email: "bob@x.com".into(),
            content: "hi".into(),
        },
        OutboundCommand::MarkRead { message_id: "m1".into() },
        OutboundCommand::TypingStart { receiver_id: "u2".into() },
        OutboundCommand::TypingStop { receiver_id: "u2".into() },
        OutboundCommand::GetUnreadCount {},
    ]
}

#[test]
fn serde_envelope_matches_kind_and_data() -> anyhow::Result<()> {
    for command in all_commands() {
        let wire = serde_json::to_value(&command)?;
        assert_eq!(wire["type"], command.kind());
        assert_eq!(wire["data"], command.data(), "{}", command.kind());
    }
    Ok(())
}

#[test]
fn get_unread_count_carries_empty_object() -> anyhow::Result<()> {
    let wire = serde_json::to_string(&OutboundCommand::GetUnreadCount {})?;
    assert_eq!(wire, r#"{"type":"get_unread_count","data":{}}"#);
    Ok(())
}

#[test]
fn send_message_field_names() {
    let cmd = OutboundCommand::SendMessage { receiver_email: "a@b.c".into(), content: "x".into() };
    assert_eq!(cmd.data(), json!({"receiver_email": "a@b.c", "content": "x"}));
}

struct Recorder {
    connected: bool,
    sent: Mutex<Vec<OutboundCommand>>,
}

impl CommandSink for Recorder {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_command(&self, command: OutboundCommand) -> bool {
        self.sent.lock().push(command);
        self.connected
    }
}

#[test]
fn helpers_build_the_expected_commands() {
    let sink = Recorder { connected: true, sent: Mutex::new(Vec::new()) };
    assert!(sink.send_message("bob@x.com", "hi"));
    assert!(sink.mark_read("m1"));
    assert!(sink.start_typing("u2"));
    assert!(sink.stop_typing("u2"));
    assert!(sink.get_unread_count());
    assert_eq!(*sink.sent.lock(), all_commands());
}
