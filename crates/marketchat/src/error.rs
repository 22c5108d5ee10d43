// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the messaging client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// A command was sent while the session transport was not connected.
    TransportUnavailable,
    /// An inbound frame could not be parsed.
    MalformedFrame,
    /// The backend rejected the session cookie (HTTP 401).
    Unauthorized,
    /// Automatic reconnection gave up.
    ReconnectExhausted,
    /// A REST call failed for any reason other than 401.
    Upstream,
    /// A message with empty or whitespace-only content.
    EmptyContent,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportUnavailable => "TRANSPORT_UNAVAILABLE",
            Self::MalformedFrame => "MALFORMED_FRAME",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ReconnectExhausted => "RECONNECT_EXHAUSTED",
            Self::Upstream => "UPSTREAM_ERROR",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Build an [`ApiError`] with this code and no HTTP status.
    pub fn to_error(&self, message: impl Into<String>) -> ApiError {
        ApiError { code: *self, status: None, message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by REST calls and the refresh gate.
///
/// Cloneable so a single refresh failure can be handed to every request that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    /// Classify an HTTP error status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = if status == 401 { ErrorCode::Unauthorized } else { ErrorCode::Upstream };
        Self { code, status: Some(status), message: message.into() }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), e.to_string()),
            None => ErrorCode::Upstream.to_error(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
