// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Default backend when `MARKETCHAT_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Which participant attribute keys the derived conversation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConversationKey {
    /// Key by the other participant's email (existing behavior).
    #[default]
    Email,
    /// Key by the other participant's stable user id.
    ParticipantId,
}

/// Configuration for the marketchat messaging client.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "marketchat", version, about = "Real-time marketplace messaging client")]
pub struct ClientConfig {
    /// Backend base URL.
    #[arg(long, default_value = DEFAULT_API_URL, env = "MARKETCHAT_API_URL")]
    pub api_url: String,

    /// Path of the messaging WebSocket endpoint.
    #[arg(long, default_value = "/ws/messages", env = "MARKETCHAT_WS_PATH")]
    pub ws_path: String,

    /// First reconnect delay in milliseconds.
    #[arg(long, default_value_t = 1000, env = "MARKETCHAT_RECONNECT_BASE_MS")]
    pub reconnect_base_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds.
    #[arg(long, default_value_t = 32000, env = "MARKETCHAT_RECONNECT_CAP_MS")]
    pub reconnect_cap_ms: u64,

    /// Consecutive reconnect attempts before giving up.
    #[arg(long, default_value_t = 10, env = "MARKETCHAT_MAX_RECONNECT_ATTEMPTS")]
    pub max_reconnect_attempts: u32,

    /// HTTP request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "MARKETCHAT_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// How long a typing indicator stays on without a refresh.
    #[arg(long, default_value_t = 3000, env = "MARKETCHAT_TYPING_TIMEOUT_MS")]
    pub typing_timeout_ms: u64,

    /// Identity re-validation interval in seconds (0 = disabled).
    #[arg(long, default_value_t = 300, env = "MARKETCHAT_VALIDATE_INTERVAL_SECS")]
    pub validate_interval_secs: u64,

    /// Participant attribute used to key conversations.
    #[arg(long, value_enum, default_value_t = ConversationKey::Email, env = "MARKETCHAT_CONVERSATION_KEY")]
    pub conversation_key: ConversationKey,

    /// Session cookie (`name=value`) to seed into the cookie jar.
    #[arg(long, env = "MARKETCHAT_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Log format (json or text).
    #[arg(long, env = "MARKETCHAT_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "MARKETCHAT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ClientConfig {
    /// Config pointing at `api_url` with every other field at its default.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_path: "/ws/messages".to_owned(),
            reconnect_base_ms: 1000,
            reconnect_cap_ms: 32000,
            max_reconnect_attempts: 10,
            request_timeout_ms: 10000,
            typing_timeout_ms: 3000,
            validate_interval_secs: 300,
            conversation_key: ConversationKey::Email,
            session_cookie: None,
            log_format: "text".to_owned(),
            log_level: "info".to_owned(),
        }
    }

    /// Backend base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// WebSocket endpoint derived from the backend URL.
    pub fn ws_url(&self) -> String {
        build_ws_url(&self.api_url, &self.ws_path)
    }

    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }

    pub fn reconnect_cap(&self) -> Duration {
        Duration::from_millis(self.reconnect_cap_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    /// `None` when periodic validation is disabled.
    pub fn validate_interval(&self) -> Option<Duration> {
        match self.validate_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Build a WebSocket URL from an HTTP base URL.
///
/// `https` pairs with `wss`; anything else gets plain `ws`.
pub fn build_ws_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let (scheme, host) = if let Some(rest) = base.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        ("ws", rest)
    } else {
        ("ws", base)
    };
    let path = path.trim_start_matches('/');
    format!("{scheme}://{host}/{path}")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
