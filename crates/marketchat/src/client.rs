// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One messaging client: bus, REST client, transport, store and auth gate,
//! constructed once and wired together.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::cookie::Jar;
use reqwest::Url;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::{spawn_identity_validation, spawn_session_wiring, AuthGate};
use crate::config::ClientConfig;
use crate::events::{EventBus, Listener};
use crate::protocol::kind;
use crate::rest::client::ensure_crypto_provider;
use crate::rest::{ApiClient, IdentityApi, MessageApi};
use crate::store::{ConversationStore, StoreBinding};
use crate::transport::{
    CommandSink, ConnectionState, HandshakeCookies, ReconnectPolicy, SessionTransport,
};

/// Seed `jar` from a `name=value; name2=value2` cookie string.
pub fn seed_cookies(jar: &Jar, cookies: &str, origin: &Url) -> usize {
    let mut seeded = 0;
    for pair in cookies.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        jar.add_cookie_str(pair, origin);
        seeded += 1;
    }
    seeded
}

#[derive(Default)]
struct Running {
    binding: Option<StoreBinding>,
    expiry: Option<Listener>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct ChatClient {
    config: ClientConfig,
    bus: Arc<EventBus>,
    api: Arc<ApiClient>,
    transport: Arc<SessionTransport>,
    store: Arc<ConversationStore>,
    auth: Arc<AuthGate>,
    shutdown: CancellationToken,
    running: Mutex<Running>,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let origin = Url::parse(config.api_base())
            .map_err(|e| anyhow::anyhow!("invalid api url {}: {e}", config.api_base()))?;

        let jar = Arc::new(Jar::default());
        if let Some(ref cookies) = config.session_cookie {
            let seeded = seed_cookies(&jar, cookies, &origin);
            tracing::debug!(seeded, "session cookies seeded");
        }

        let bus = Arc::new(EventBus::new());
        let api = Arc::new(ApiClient::from_config(&config, Arc::clone(&jar), Arc::clone(&bus))?);
        let transport = SessionTransport::new(
            config.ws_url(),
            ReconnectPolicy::from_config(&config),
            Some(HandshakeCookies { jar, origin }),
            Arc::clone(&bus),
        );
        let store = ConversationStore::from_config(
            &config,
            Arc::clone(&api) as Arc<dyn MessageApi>,
            Arc::clone(&transport) as Arc<dyn CommandSink>,
        );
        let auth = AuthGate::new(Arc::clone(&api) as Arc<dyn IdentityApi>);

        Ok(Self {
            config,
            bus,
            api,
            transport,
            store,
            auth,
            shutdown: CancellationToken::new(),
            running: Mutex::new(Running::default()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn transport(&self) -> &Arc<SessionTransport> {
        &self.transport
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn auth(&self) -> &Arc<AuthGate> {
        &self.auth
    }

    /// Subscribe the store, start the background tasks and probe the
    /// identity. Returns whether the session is authenticated.
    pub async fn start(&self) -> bool {
        {
            let mut running = self.running.lock();
            if running.binding.is_none() {
                running.binding = Some(StoreBinding::attach(Arc::clone(&self.store), &self.bus));
                running.expiry = Some(self.auth.listen_for_expiry(&self.bus));
                running.tasks.push(spawn_session_wiring(
                    &self.auth,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.store),
                    self.shutdown.child_token(),
                ));
                if let Some(interval) = self.config.validate_interval() {
                    running.tasks.push(spawn_identity_validation(
                        Arc::clone(&self.auth),
                        interval,
                        self.shutdown.child_token(),
                    ));
                }
            }
        }
        self.auth.fetch_me().await
    }

    /// Reconnect a logged-in user whose transport has dropped, re-enabling
    /// auto-reconnect.
    pub fn resume(&self) -> bool {
        if !self.auth.is_logged_in() {
            return false;
        }
        if self.transport.state().state != ConnectionState::Disconnected {
            return false;
        }
        tracing::info!("resuming session transport");
        self.transport.connect();
        true
    }

    /// Stop background work and close the transport for good.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.transport.disconnect(true);

        let running = std::mem::take(&mut *self.running.lock());
        if let Some(binding) = running.binding {
            binding.detach(&self.bus);
        }
        if let Some(expiry) = running.expiry {
            self.bus.off(kind::SESSION_EXPIRED, &expiry);
        }
        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::debug!(err = %e, "background task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
