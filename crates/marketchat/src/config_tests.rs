// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::*;

#[yare::parameterized(
    plain_http = { "http://localhost:8000", "ws://localhost:8000/ws/messages" },
    secure = { "https://api.example.com", "wss://api.example.com/ws/messages" },
    trailing_slash = { "https://api.example.com/", "wss://api.example.com/ws/messages" },
    no_scheme = { "localhost:9000", "ws://localhost:9000/ws/messages" },
)]
fn ws_url_mirrors_backend_scheme(base: &str, expected: &str) {
    assert_eq!(build_ws_url(base, "/ws/messages"), expected);
}

#[test]
fn defaults_match_documented_values() -> anyhow::Result<()> {
    let config = ClientConfig::try_parse_from(["marketchat"])?;
    assert_eq!(config.api_url, DEFAULT_API_URL);
    assert_eq!(config.reconnect_base(), Duration::from_secs(1));
    assert_eq!(config.reconnect_cap(), Duration::from_secs(32));
    assert_eq!(config.max_reconnect_attempts, 10);
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.typing_timeout(), Duration::from_secs(3));
    assert_eq!(config.validate_interval(), Some(Duration::from_secs(300)));
    assert_eq!(config.conversation_key, ConversationKey::Email);
    assert_eq!(config.ws_url(), "ws://localhost:8000/ws/messages");
    Ok(())
}

#[test]
fn parsed_defaults_agree_with_with_api_url() -> anyhow::Result<()> {
    let parsed = ClientConfig::try_parse_from(["marketchat", "--api-url", "http://h:1"])?;
    let built = ClientConfig::with_api_url("http://h:1");
    assert_eq!(parsed.ws_url(), built.ws_url());
    assert_eq!(parsed.reconnect_base(), built.reconnect_base());
    assert_eq!(parsed.max_reconnect_attempts, built.max_reconnect_attempts);
    assert_eq!(parsed.typing_timeout(), built.typing_timeout());
    Ok(())
}

#[test]
fn zero_interval_disables_validation() -> anyhow::Result<()> {
    let config =
        ClientConfig::try_parse_from(["marketchat", "--validate-interval-secs", "0"])?;
    assert_eq!(config.validate_interval(), None);
    Ok(())
}

#[test]
fn conversation_key_accepts_participant_id() -> anyhow::Result<()> {
    let config =
        ClientConfig::try_parse_from(["marketchat", "--conversation-key", "participant-id"])?;
    assert_eq!(config.conversation_key, ConversationKey::ParticipantId);
    Ok(())
}

#[test]
fn api_base_trims_trailing_slash() {
    let config = ClientConfig::with_api_url("https://api.example.com/");
    assert_eq!(config.api_base(), "https://api.example.com");
}
