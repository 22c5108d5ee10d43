// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST side of the client: cookie-authenticated HTTP calls with a shared
//! 401 refresh gate.

pub mod client;
pub mod refresh;

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::model::{Message, User};

pub use client::{ApiClient, ApiRequest};
pub use refresh::RefreshGate;

/// Where the session-expired notice sends the user.
pub const LOGIN_ROUTE: &str = "/login";

/// Endpoint paths, relative to the API base URL.
pub mod path {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

    pub const ME: &str = "auth/me";
    pub const REFRESH: &str = "auth/refresh";
    pub const LOGIN: &str = "auth/login";
    pub const LOGOUT: &str = "auth/logout";
    pub const CLEAR_SESSION: &str = "auth/clear-session";
    pub const SEND_MESSAGE: &str = "messages/send";
    pub const USER_MESSAGES: &str = "messages/user-messages";
    pub const UNREAD_COUNT: &str = "messages/unread-count";

    /// Paths whose 401 must not trigger a refresh.
    pub const REFRESH_EXEMPT: [&str; 4] = [REFRESH, LOGIN, LOGOUT, ME];

    /// Characters escaped inside a single path segment.
    const SEGMENT: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'%')
        .add(b'/')
        .add(b'<')
        .add(b'>')
        .add(b'?')
        .add(b'\\')
        .add(b'`')
        .add(b'{')
        .add(b'}');

    pub fn segment(raw: &str) -> String {
        utf8_percent_encode(raw, SEGMENT).to_string()
    }

    pub fn mark_read(message_id: &str) -> String {
        format!("messages/{}/read", segment(message_id))
    }

    pub fn conversation(email: &str) -> String {
        format!("messages/conversation/{}", segment(email))
    }
}

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Message endpoints used by the conversation store.
pub trait MessageApi: Send + Sync {
    fn send_message<'a>(&'a self, receiver_email: &'a str, content: &'a str)
        -> ApiFuture<'a, Message>;

    fn mark_read<'a>(&'a self, message_id: &'a str) -> ApiFuture<'a, ()>;

    /// The full message log of the current user.
    fn user_messages(&self) -> ApiFuture<'_, Vec<Message>>;

    fn conversation<'a>(&'a self, email: &'a str) -> ApiFuture<'a, Vec<Message>>;

    fn unread_count(&self) -> ApiFuture<'_, u64>;
}

/// Identity endpoints used by the auth gate.
pub trait IdentityApi: Send + Sync {
    fn fetch_me(&self) -> ApiFuture<'_, User>;

    fn logout(&self) -> ApiFuture<'_, ()>;
}
