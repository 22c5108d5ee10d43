// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound commands and the sink they are written to.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A command the client pushes over the session transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundCommand {
    SendMessage { receiver_email: String, content: String },
    MarkRead { message_id: String },
    TypingStart { receiver_id: String },
    TypingStop { receiver_id: String },
    GetUnreadCount {},
}

impl OutboundCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::MarkRead { .. } => "mark_read",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::GetUnreadCount {} => "get_unread_count",
        }
    }

    /// The `data` half of the envelope.
    pub fn data(&self) -> Value {
        match self {
            Self::SendMessage { receiver_email, content } => {
                json!({ "receiver_email": receiver_email, "content": content })
            }
            Self::MarkRead { message_id } => json!({ "message_id": message_id }),
            Self::TypingStart { receiver_id } | Self::TypingStop { receiver_id } => {
                json!({ "receiver_id": receiver_id })
            }
            Self::GetUnreadCount {} => json!({}),
        }
    }
}

/// Anything that can carry [`OutboundCommand`]s.
///
/// Sends are fire-and-forget: `true` means the frame was queued on a live
/// connection, `false` means the transport was unavailable and the caller
/// should fall back. Answers arrive later as independent inbound events.
pub trait CommandSink: Send + Sync {
    fn is_connected(&self) -> bool;

    fn send_command(&self, command: OutboundCommand) -> bool;

    fn send_message(&self, receiver_email: &str, content: &str) -> bool {
        self.send_command(OutboundCommand::SendMessage {
            receiver_email: receiver_email.to_owned(),
            content: content.to_owned(),
        })
    }

    fn mark_read(&self, message_id: &str) -> bool {
        self.send_command(OutboundCommand::MarkRead { message_id: message_id.to_owned() })
    }

    fn start_typing(&self, receiver_id: &str) -> bool {
        self.send_command(OutboundCommand::TypingStart { receiver_id: receiver_id.to_owned() })
    }

    fn stop_typing(&self, receiver_id: &str) -> bool {
        self.send_command(OutboundCommand::TypingStop { receiver_id: receiver_id.to_owned() })
    }

    fn get_unread_count(&self) -> bool {
        self.send_command(OutboundCommand::GetUnreadCount {})
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
