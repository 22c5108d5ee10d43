// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session transport: one live WebSocket to the messaging endpoint.
//!
//! Inbound text frames are parsed and published on the event bus in arrival
//! order by the single connection task. Closes (clean or not) publish
//! `disconnected` and, while auto-reconnect is armed, schedule the next
//! attempt with exponential backoff. Every connection carries a generation
//! number so a socket torn down by `disconnect` cannot report back into a
//! newer session.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use reqwest::cookie::{CookieStore, Jar};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorCode;
use crate::events::EventBus;
use crate::protocol::{kind, parse_frame};
use crate::transport::backoff::ReconnectPolicy;
use crate::transport::commands::{CommandSink, OutboundCommand};
use crate::transport::machine::{CloseOutcome, ConnectionState, SessionMachine, TransportSnapshot};

/// Cookies attached to the WebSocket handshake.
#[derive(Clone)]
pub struct HandshakeCookies {
    pub jar: Arc<Jar>,
    /// HTTP origin the cookies were issued for.
    pub origin: reqwest::Url,
}

struct Inner {
    machine: SessionMachine,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    conn_cancel: Option<CancellationToken>,
    reconnect_cancel: Option<CancellationToken>,
}

pub struct SessionTransport {
    url: String,
    cookies: Option<HandshakeCookies>,
    bus: Arc<EventBus>,
    inner: Mutex<Inner>,
}

impl SessionTransport {
    pub fn new(
        url: String,
        policy: ReconnectPolicy,
        cookies: Option<HandshakeCookies>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            url,
            cookies,
            bus,
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(policy),
                generation: 0,
                outbound: None,
                conn_cancel: None,
                reconnect_cancel: None,
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> TransportSnapshot {
        self.inner.lock().machine.snapshot()
    }

    /// Open the connection unless one is already open or opening.
    ///
    /// An explicit connect re-arms auto-reconnect and resets the attempt
    /// budget. Must be called from within a tokio runtime.
    pub fn connect(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.machine.is_active() {
            tracing::debug!(url = %self.url, "transport already connected or connecting");
            return;
        }
        inner.machine.rearm();
        if let Some(pending) = inner.reconnect_cancel.take() {
            pending.cancel();
        }
        self.open_locked(&mut inner);
    }

    /// Close the connection.
    ///
    /// `permanent` disables auto-reconnect until the next explicit
    /// [`connect`](Self::connect) and cancels any scheduled reconnect. A
    /// temporary disconnect of a live connection is handled like any other
    /// close: `disconnected` fires and the next attempt is scheduled.
    pub fn disconnect(self: &Arc<Self>, permanent: bool) {
        let outcome = {
            let mut inner = self.inner.lock();
            if let Some(pending) = inner.reconnect_cancel.take() {
                pending.cancel();
            }
            if let Some(conn) = inner.conn_cancel.take() {
                conn.cancel();
            }
            inner.generation += 1;
            let was_active = inner.machine.is_active();
            if permanent || !was_active {
                inner.outbound = None;
                inner.machine.disconnect(permanent);
                was_active.then_some(CloseOutcome::Idle)
            } else {
                Some(self.close_locked(&mut inner))
            }
        };

        tracing::info!(permanent, "transport disconnected");
        if let Some(outcome) = outcome {
            self.announce_close(outcome, None);
        }
    }

    /// Send a raw `{type, data}` frame.
    ///
    /// Returns false and publishes `send_failed` with the attempted frame when
    /// not connected.
    pub fn send(&self, frame_type: &str, data: Value) -> bool {
        let frame = json!({ "type": frame_type, "data": data });
        let queued = {
            let inner = self.inner.lock();
            match (&inner.outbound, inner.machine.state()) {
                (Some(tx), ConnectionState::Connected) => tx.send(frame.to_string()).is_ok(),
                _ => false,
            }
        };

        if queued {
            tracing::debug!(frame_type, "frame queued");
        } else {
            let err = ErrorCode::TransportUnavailable.to_error("transport not connected");
            tracing::warn!(frame_type, err = %err, "frame not sent");
            self.bus.emit(kind::SEND_FAILED, &frame);
        }
        queued
    }

    fn open_locked(self: &Arc<Self>, inner: &mut Inner) {
        if !inner.machine.begin_connect() {
            return;
        }
        inner.generation += 1;
        let cancel = CancellationToken::new();
        inner.conn_cancel = Some(cancel.clone());

        tracing::info!(url = %self.url, "connecting");
        let this = Arc::clone(self);
        let generation = inner.generation;
        tokio::spawn(async move { this.run_connection(generation, cancel).await });
    }

    async fn run_connection(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        let request = match self.handshake_request() {
            Ok(request) => request,
            Err(e) => {
                self.connection_lost(generation, Some(e));
                return;
            }
        };

        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio_tungstenite::connect_async(request) => result,
        };
        let ws = match connected {
            Ok((ws, _)) => ws,
            Err(e) => {
                self.connection_lost(generation, Some(format!("connect failed: {e}")));
                return;
            }
        };

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        if !self.connection_opened(generation, out_tx) {
            return;
        }
        tracing::info!(url = %self.url, "transport connected");
        self.bus.emit(kind::CONNECTED, &Value::Null);

        let (mut sink, mut stream) = ws.split();
        let failure = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return;
                }
                outbound = out_rx.recv() => {
                    let Some(text) = outbound else { break None };
                    if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                        break Some(format!("send failed: {e}"));
                    }
                }
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(WsMessage::Text(text))) => self.dispatch_frame(&text),
                        Some(Ok(WsMessage::Close(frame))) => {
                            if let Some(frame) = frame {
                                tracing::info!(code = %frame.code, reason = %frame.reason.as_str(), "server closed transport");
                            }
                            break None;
                        }
                        Some(Ok(_)) => {} // Binary, ping and pong ignored.
                        Some(Err(e)) => break Some(format!("read failed: {e}")),
                        None => break None,
                    }
                }
            }
        };

        self.connection_lost(generation, failure);
    }

    fn handshake_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, String> {
        let mut request =
            self.url.as_str().into_client_request().map_err(|e| format!("bad ws url: {e}"))?;
        if let Some(ref cookies) = self.cookies {
            if let Some(header) = cookies.jar.cookies(&cookies.origin) {
                request.headers_mut().insert(COOKIE, header);
            }
        }
        Ok(request)
    }

    /// Record a successful open. False when the attempt went stale.
    fn connection_opened(&self, generation: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.machine.opened();
        inner.outbound = Some(outbound);
        true
    }

    fn connection_lost(self: &Arc<Self>, generation: u64, failure: Option<String>) {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.conn_cancel = None;
            self.close_locked(&mut inner)
        };
        self.announce_close(outcome, failure);
    }

    /// Record a close and schedule the next attempt if one is due.
    fn close_locked(self: &Arc<Self>, inner: &mut Inner) -> CloseOutcome {
        inner.outbound = None;
        let outcome = inner.machine.closed();
        if let CloseOutcome::Reconnect { delay, .. } = outcome {
            self.schedule_locked(inner, delay);
        }
        outcome
    }

    fn announce_close(&self, outcome: CloseOutcome, failure: Option<String>) {
        if let Some(ref err) = failure {
            tracing::warn!(url = %self.url, err = %err, "transport error");
            self.bus.emit(kind::ERROR, &json!({ "message": err }));
        }
        self.bus.emit(kind::DISCONNECTED, &Value::Null);

        match outcome {
            CloseOutcome::Reconnect { attempt, delay } => {
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            }
            CloseOutcome::Exhausted => {
                let err = ErrorCode::ReconnectExhausted.to_error("max reconnect attempts reached");
                tracing::error!(url = %self.url, err = %err, "giving up on transport");
                self.bus.emit(
                    kind::MAX_RECONNECT_ATTEMPTS,
                    &json!({ "code": err.code.as_str(), "message": err.message }),
                );
            }
            CloseOutcome::Idle => {}
        }
    }

    fn schedule_locked(self: &Arc<Self>, inner: &mut Inner, delay: std::time::Duration) {
        let token = CancellationToken::new();
        inner.reconnect_cancel = Some(token.clone());
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => this.reconnect_now(),
            }
        });
    }

    fn reconnect_now(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        inner.reconnect_cancel = None;
        if !inner.machine.reconnect_enabled() {
            return;
        }
        self.open_locked(&mut inner);
    }

    fn dispatch_frame(&self, text: &str) {
        match parse_frame(text) {
            Ok(frame) => {
                tracing::debug!(kind = %frame.kind, "frame received");
                self.bus.emit(&frame.kind, &frame.data);
            }
            Err(e) => tracing::warn!(err = %e, "dropping malformed frame"),
        }
    }
}

impl CommandSink for SessionTransport {
    fn is_connected(&self) -> bool {
        self.inner.lock().machine.state() == ConnectionState::Connected
    }

    fn send_command(&self, command: OutboundCommand) -> bool {
        self.send(command.kind(), command.data())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
