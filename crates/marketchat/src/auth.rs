// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication state and its effect on the session transport.
//!
//! The gate publishes every state change on a watch channel. The session
//! wiring task turns those changes into transport connects, permanent
//! disconnects, and store resets.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{listener, EventBus, Listener};
use crate::model::User;
use crate::protocol::kind;
use crate::rest::IdentityApi;
use crate::store::ConversationStore;
use crate::transport::{ConnectionState, SessionTransport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// True until the first identity probe settles.
    pub is_loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { user: None, is_authenticated: false, is_loading: true }
    }
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self { user: None, is_authenticated: false, is_loading: false }
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user), is_authenticated: true, is_loading: false }
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_authenticated && self.user.is_some()
    }

    pub fn user_full_name(&self) -> Option<String> {
        self.user.as_ref().map(User::full_name)
    }

    fn user_id(&self) -> Option<&str> {
        match self.user {
            Some(ref user) if self.is_authenticated => Some(user.id.as_str()),
            _ => None,
        }
    }
}

pub struct AuthGate {
    api: Arc<dyn IdentityApi>,
    state: watch::Sender<AuthState>,
}

impl AuthGate {
    pub fn new(api: Arc<dyn IdentityApi>) -> Arc<Self> {
        let (state, _) = watch::channel(AuthState::default());
        Arc::new(Self { api, state })
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    pub fn user_full_name(&self) -> Option<String> {
        self.state.borrow().user_full_name()
    }

    /// Probe the current identity. Any failure leaves the gate anonymous.
    pub async fn fetch_me(&self) -> bool {
        match self.api.fetch_me().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "identity confirmed");
                self.replace(AuthState::authenticated(user));
                true
            }
            Err(e) => {
                tracing::warn!(err = %e, "identity probe failed");
                self.replace(AuthState::anonymous());
                false
            }
        }
    }

    /// Log out on the server, then clear local state whatever the outcome.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(err = %e, "logout request failed");
        }
        self.clear_auth();
    }

    pub fn set_auth(&self, user: User) {
        self.replace(AuthState::authenticated(user));
    }

    pub fn clear_auth(&self) {
        self.replace(AuthState::anonymous());
    }

    /// Clear auth whenever the REST layer reports the session expired.
    pub fn listen_for_expiry(self: &Arc<Self>, bus: &EventBus) -> Listener {
        let gate = Arc::clone(self);
        let callback = listener(move |data| {
            tracing::warn!(redirect = %data["redirect"], "session expired");
            gate.clear_auth();
        });
        bus.on(kind::SESSION_EXPIRED, Arc::clone(&callback));
        callback
    }

    fn replace(&self, next: AuthState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// The transport operations the session wiring drives.
pub trait SessionLink: Send + Sync + 'static {
    /// Connecting or connected.
    fn is_active(&self) -> bool;
    fn connect(&self);
    fn disconnect(&self, permanent: bool);
}

impl SessionLink for Arc<SessionTransport> {
    fn is_active(&self) -> bool {
        self.state().state != ConnectionState::Disconnected
    }

    fn connect(&self) {
        SessionTransport::connect(self);
    }

    fn disconnect(&self, permanent: bool) {
        SessionTransport::disconnect(self, permanent);
    }
}

fn apply<L: SessionLink>(state: &AuthState, link: &L, store: &ConversationStore) {
    if state.is_loading {
        return;
    }
    match state.user_id() {
        Some(user_id) => {
            let previous = store.current_user_id();
            if previous.as_deref().is_some_and(|prev| prev != user_id) {
                tracing::info!(user_id, "user changed, resetting session");
                link.disconnect(true);
                store.clear_state();
            }
            store.set_current_user(user_id);
            if !link.is_active() {
                tracing::debug!(user_id, "authenticated, connecting transport");
                link.connect();
            }
        }
        None => {
            tracing::debug!("anonymous, closing transport and clearing conversations");
            link.disconnect(true);
            store.clear_state();
        }
    }
}

/// Follow auth changes: authenticated users get a live transport, anonymous
/// ones a permanently closed transport and an empty store.
pub fn spawn_session_wiring<L: SessionLink>(
    auth: &AuthGate,
    link: L,
    store: Arc<ConversationStore>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = auth.subscribe();
    tokio::spawn(async move {
        loop {
            let state = rx.borrow_and_update().clone();
            apply(&state, &link, &store);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Re-probe the identity every `interval` while authenticated.
pub fn spawn_identity_validation(
    auth: Arc<AuthGate>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if auth.snapshot().is_authenticated {
                        tracing::debug!("revalidating identity");
                        auth.fetch_me().await;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
