// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie-authenticated HTTP client for the messaging backend.

use std::sync::{Arc, Once};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorCode};
use crate::events::EventBus;
use crate::model::{Message, User};
use crate::protocol::{kind, UnreadCount};
use crate::rest::refresh::RefreshGate;
use crate::rest::{path, ApiFuture, IdentityApi, MessageApi, LOGIN_ROUTE};

/// One REST call, replayable after a session refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Set once the request has been through a refresh, so a second 401 is
    /// returned to the caller instead of refreshing again.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, retried: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Auth endpoints whose 401 is final.
    pub fn is_refresh_exempt(&self) -> bool {
        path::REFRESH_EXEMPT.iter().any(|exempt| self.path.contains(exempt))
    }
}

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the rustls ring provider (reqwest needs it even on plain HTTP).
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client sharing one cookie jar with the session transport.
pub struct ApiClient {
    base_url: String,
    http: Client,
    jar: Arc<Jar>,
    gate: RefreshGate,
    bus: Arc<EventBus>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        jar: Arc<Jar>,
        timeout: Duration,
        bus: Arc<EventBus>,
    ) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let http = Client::builder().cookie_provider(Arc::clone(&jar)).timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { base_url, http, jar, gate: RefreshGate::new(), bus })
    }

    pub fn from_config(
        config: &ClientConfig,
        jar: Arc<Jar>,
        bus: Arc<EventBus>,
    ) -> anyhow::Result<Self> {
        Self::new(config.api_base(), jar, config.request_timeout(), bus)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    pub fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request`, refreshing the session once on a 401.
    ///
    /// Concurrent 401s share a single refresh through the gate. If the
    /// refresh fails every one of them gets its error.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Value, ApiError> {
        match self.execute(&request).await {
            Err(e) if e.is_unauthorized() && !request.retried && !request.is_refresh_exempt() => {
                request.retried = true;
                tracing::debug!(path = %request.path, "unauthorized, refreshing session");
                self.gate.coalesce(|| self.refresh_or_expire()).await?;
                self.execute(&request).await
            }
            other => other,
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = self.send(request).await?;
        serde_json::from_value(value).map_err(|e| {
            ErrorCode::Upstream.to_error(format!("unexpected response from {path}: {e}"))
        })
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut builder = self.http.request(request.method.clone(), self.url(&request.path));
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), error_detail(&text, status)));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ErrorCode::Upstream.to_error(format!("invalid response body: {e}")))
    }

    /// Refresh the session. On failure, clear the server-side session and
    /// publish `session_expired` before the error reaches any waiter.
    async fn refresh_or_expire(&self) -> Result<(), ApiError> {
        match self.execute(&ApiRequest::post(path::REFRESH)).await {
            Ok(_) => {
                tracing::info!("session refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(err = %e, "session refresh failed");
                if let Err(clear) = self.execute(&ApiRequest::get(path::CLEAR_SESSION)).await {
                    tracing::debug!(err = %clear, "clear-session failed");
                }
                self.bus.emit(kind::SESSION_EXPIRED, &json!({ "redirect": LOGIN_ROUTE }));
                Err(e)
            }
        }
    }
}

/// FastAPI-style `{"detail": ...}` bodies collapse to their detail text.
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| match v.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    });
    match detail {
        Some(detail) => detail,
        None if body.trim().is_empty() => status.to_string(),
        None => body.trim().to_owned(),
    }
}

impl MessageApi for ApiClient {
    fn send_message<'a>(
        &'a self,
        receiver_email: &'a str,
        content: &'a str,
    ) -> ApiFuture<'a, Message> {
        Box::pin(async move {
            let body = json!({ "receiver_email": receiver_email, "content": content });
            self.send_json(ApiRequest::post(path::SEND_MESSAGE).json(body)).await
        })
    }

    fn mark_read<'a>(&'a self, message_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.send(ApiRequest::patch(path::mark_read(message_id))).await?;
            Ok(())
        })
    }

    fn user_messages(&self) -> ApiFuture<'_, Vec<Message>> {
        Box::pin(self.send_json(ApiRequest::get(path::USER_MESSAGES)))
    }

    fn conversation<'a>(&'a self, email: &'a str) -> ApiFuture<'a, Vec<Message>> {
        Box::pin(self.send_json(ApiRequest::get(path::conversation(email))))
    }

    fn unread_count(&self) -> ApiFuture<'_, u64> {
        Box::pin(async move {
            let count: UnreadCount = self.send_json(ApiRequest::get(path::UNREAD_COUNT)).await?;
            Ok(count.unread_count)
        })
    }
}

impl IdentityApi for ApiClient {
    fn fetch_me(&self) -> ApiFuture<'_, User> {
        Box::pin(self.send_json(ApiRequest::get(path::ME)))
    }

    fn logout(&self) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.send(ApiRequest::post(path::LOGOUT)).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
