// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire envelopes for the messaging WebSocket.
//!
//! Both directions carry `{"type": ..., "data": {...}}`. Replies are matched by
//! event type only; there is no request id, so two quick `get_unread_count`
//! requests are indistinguishable by their answers (last value wins).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ErrorCode};
use crate::model::Message;

/// Event names published on the [`EventBus`](crate::events::EventBus).
pub mod kind {
    // Synthesized locally by the transport.
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const ERROR: &str = "error";
    pub const SEND_FAILED: &str = "send_failed";
    pub const MAX_RECONNECT_ATTEMPTS: &str = "max_reconnect_attempts";
    // Synthesized by the REST client when the session cannot be refreshed.
    pub const SESSION_EXPIRED: &str = "session_expired";

    // Server frames.
    pub const MESSAGE_RECEIVED: &str = "message_received";
    pub const MESSAGE_SENT: &str = "message_sent";
    pub const READ_RECEIPT: &str = "read_receipt";
    pub const TYPING_INDICATOR: &str = "typing_indicator";
    pub const USER_STATUS: &str = "user_status";
    pub const UNREAD_COUNT_UPDATE: &str = "unread_count_update";
}

/// An inbound frame before its payload is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse a text frame into its `{type, data}` envelope.
pub fn parse_frame(text: &str) -> Result<InboundFrame, ApiError> {
    serde_json::from_str(text).map_err(|e| ErrorCode::MalformedFrame.to_error(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: String,
    #[serde(default, with = "crate::model::timestamp::option")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reader_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub user_id: String,
    pub typing: bool,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    pub status: String,
}

impl UserStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread_count: u64,
}

/// Error frame pushed by the server (`{"type":"error","data":{"message":...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: String,
}

/// A bus event the conversation store reacts to, with its payload decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected,
    Disconnected,
    MessageReceived(Message),
    MessageSent(Message),
    ReadReceipt(ReadReceipt),
    TypingIndicator(TypingIndicator),
    UserStatus(UserStatus),
    UnreadCountUpdate(UnreadCount),
    Error(ServerError),
    SendFailed(Value),
}

impl ServerEvent {
    /// Every event name [`ServerEvent::decode`] understands.
    pub const NAMES: [&'static str; 10] = [
        kind::CONNECTED,
        kind::DISCONNECTED,
        kind::MESSAGE_RECEIVED,
        kind::MESSAGE_SENT,
        kind::READ_RECEIPT,
        kind::TYPING_INDICATOR,
        kind::USER_STATUS,
        kind::UNREAD_COUNT_UPDATE,
        kind::ERROR,
        kind::SEND_FAILED,
    ];

    /// Decode the payload of a bus event. Returns `None` for unknown names.
    pub fn decode(name: &str, data: &Value) -> Option<Result<Self, ApiError>> {
        let event = match name {
            kind::CONNECTED => Ok(Self::Connected),
            kind::DISCONNECTED => Ok(Self::Disconnected),
            kind::MESSAGE_RECEIVED => payload(data).map(Self::MessageReceived),
            kind::MESSAGE_SENT => payload(data).map(Self::MessageSent),
            kind::READ_RECEIPT => payload(data).map(Self::ReadReceipt),
            kind::TYPING_INDICATOR => payload(data).map(Self::TypingIndicator),
            kind::USER_STATUS => payload(data).map(Self::UserStatus),
            kind::UNREAD_COUNT_UPDATE => payload(data).map(Self::UnreadCountUpdate),
            kind::ERROR => Ok(Self::Error(payload(data).unwrap_or(ServerError {
                message: data.to_string(),
            }))),
            kind::SEND_FAILED => Ok(Self::SendFailed(data.clone())),
            _ => return None,
        };
        Some(event)
    }
}

fn payload<T: serde::de::DeserializeOwned>(data: &Value) -> Result<T, ApiError> {
    T::deserialize(data).map_err(|e| ErrorCode::MalformedFrame.to_error(e.to_string()))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
