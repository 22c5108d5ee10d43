// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marketchat: real-time marketplace messaging client.
//!
//! A reconnecting WebSocket session with REST fallback, a coalescing 401
//! refresh gate, and a conversation index rebuilt from the message log.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod protocol;
pub mod rest;
pub mod store;
pub mod transport;

use tracing::{info, warn};

use crate::client::ChatClient;
use crate::config::ClientConfig;
use crate::events::listener;
use crate::protocol::{kind, ServerEvent};

/// Run the client until Ctrl-C.
pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let client = ChatClient::new(config)?;
    info!(api = %client.api().base_url(), ws = %client.transport().url(), "starting marketchat");

    let logged = ServerEvent::NAMES
        .into_iter()
        .chain([kind::MAX_RECONNECT_ATTEMPTS, kind::SESSION_EXPIRED]);
    for name in logged {
        client.bus().on(name, listener(move |data| info!(event = name, data = %data, "event")));
    }

    if client.start().await {
        info!(user = ?client.auth().user_full_name(), "authenticated");
        match client.store().load_conversations().await {
            Ok(()) => {
                for conversation in client.store().conversations() {
                    info!(
                        with = conversation.display_name().unwrap_or(&conversation.other_user_id),
                        unread = conversation.unread_count,
                        last = %conversation.last_message_time,
                        "conversation"
                    );
                }
            }
            Err(e) => warn!(err = %e, "could not load conversations"),
        }
    } else {
        warn!("not authenticated, transport stays closed");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    client.shutdown().await;
    Ok(())
}
