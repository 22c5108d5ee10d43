// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation store: reconciles pushed events and pulled REST data into one
//! view of conversations, the open transcript, presence and unread counts.
//!
//! Writes prefer the session transport and fall back to REST only when the
//! transport is down or refuses the frame. The conversation list is always
//! recomputed from the full message log rather than patched in place.

pub mod binding;
pub mod index;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::config::{ClientConfig, ConversationKey};
use crate::error::{ApiError, ErrorCode};
use crate::model::Message;
use crate::protocol::{ReadReceipt, ServerEvent, TypingIndicator, UserStatus};
use crate::rest::MessageApi;
use crate::transport::CommandSink;

pub use binding::StoreBinding;
pub use index::{fold_conversations, Conversation};

/// How a message left the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Transport,
    Rest,
}

/// Everything the UI layer reads from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub is_connected: bool,
    pub conversations: Vec<Conversation>,
    pub current_messages: Vec<Message>,
    pub selected_conversation: Option<String>,
    pub selected_conversation_name: Option<String>,
    pub selected_conversation_id: Option<String>,
    pub typing_users: BTreeSet<String>,
    pub online_users: BTreeSet<String>,
    pub unread_count: u64,
    pub current_user_id: Option<String>,
}

impl StoreSnapshot {
    /// Append unless a message with the same id is already present.
    fn push_unique(&mut self, message: Message) -> bool {
        if self.current_messages.iter().any(|m| m.message_id == message.message_id) {
            return false;
        }
        self.current_messages.push(message);
        true
    }
}

struct TypingTimer {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct StoreState {
    view: StoreSnapshot,
    typing_timers: HashMap<String, TypingTimer>,
    timer_seq: u64,
    /// Bumped by `clear_state`; loads started under an older epoch are dropped.
    epoch: u64,
}

pub struct ConversationStore {
    api: Arc<dyn MessageApi>,
    commands: Arc<dyn CommandSink>,
    keying: ConversationKey,
    typing_timeout: Duration,
    state: Arc<Mutex<StoreState>>,
}

impl ConversationStore {
    pub fn new(
        api: Arc<dyn MessageApi>,
        commands: Arc<dyn CommandSink>,
        keying: ConversationKey,
        typing_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            commands,
            keying,
            typing_timeout,
            state: Arc::new(Mutex::new(StoreState::default())),
        })
    }

    pub fn from_config(
        config: &ClientConfig,
        api: Arc<dyn MessageApi>,
        commands: Arc<dyn CommandSink>,
    ) -> Arc<Self> {
        Self::new(api, commands, config.conversation_key, config.typing_timeout())
    }

    // -- Getters ----------------------------------------------------------

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().view.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().view.is_connected
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.state.lock().view.current_user_id.clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().view.conversations.clone()
    }

    pub fn current_messages(&self) -> Vec<Message> {
        self.state.lock().view.current_messages.clone()
    }

    pub fn selected_conversation(&self) -> Option<String> {
        self.state.lock().view.selected_conversation.clone()
    }

    /// Last unread count pushed by the server or fetched over REST.
    pub fn unread_count(&self) -> u64 {
        self.state.lock().view.unread_count
    }

    /// Sum of per-conversation unread counts from the last full reload.
    pub fn total_unread_count(&self) -> u64 {
        self.state.lock().view.conversations.iter().map(|c| c.unread_count).sum()
    }

    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.state.lock().view.online_users.contains(user_id)
    }

    pub fn is_user_typing(&self, user_id: &str) -> bool {
        self.state.lock().view.typing_users.contains(user_id)
    }

    pub fn conversation_by_email(&self, email: &str) -> Option<Conversation> {
        self.state
            .lock()
            .view
            .conversations
            .iter()
            .find(|c| c.other_user_email.as_deref() == Some(email))
            .cloned()
    }

    // -- Session ----------------------------------------------------------

    /// Bumped by every [`clear_state`](Self::clear_state).
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    pub fn set_current_user(&self, user_id: impl Into<String>) {
        self.state.lock().view.current_user_id = Some(user_id.into());
    }

    /// Reset every field to its initial value. Any load still in flight is
    /// discarded when it completes.
    pub fn clear_state(&self) {
        let mut state = self.state.lock();
        for (_, timer) in state.typing_timers.drain() {
            timer.handle.abort();
        }
        state.epoch += 1;
        state.view = StoreSnapshot::default();
        tracing::debug!("conversation state cleared");
    }

    // -- Outbound ---------------------------------------------------------

    /// Send a message over the transport, or over REST when the transport is
    /// unavailable. Exactly one path is used.
    pub async fn send_message(
        &self,
        receiver_email: &str,
        content: &str,
    ) -> Result<DeliveryPath, ApiError> {
        if content.trim().is_empty() {
            tracing::warn!("refusing to send empty message");
            return Err(ErrorCode::EmptyContent.to_error("message content is empty"));
        }

        if self.commands.is_connected() && self.commands.send_message(receiver_email, content) {
            tracing::debug!(receiver = %receiver_email, "message sent over transport");
            return Ok(DeliveryPath::Transport);
        }

        tracing::debug!(receiver = %receiver_email, "sending message over REST");
        self.send_message_rest(receiver_email, content).await?;
        Ok(DeliveryPath::Rest)
    }

    /// REST send: append the server's copy to the transcript and reload.
    pub async fn send_message_rest(
        &self,
        receiver_email: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        let sent = match self.api.send_message(receiver_email, content).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(err = %e, "REST send failed");
                return Err(e);
            }
        };
        self.state.lock().view.push_unique(sent.clone());
        let _ = self.load_conversations().await;
        Ok(sent)
    }

    /// Acknowledge a message as read, over the transport when possible.
    pub async fn acknowledge(&self, message_id: &str) {
        if self.commands.is_connected() && self.commands.mark_read(message_id) {
            return;
        }
        if let Err(e) = self.api.mark_read(message_id).await {
            tracing::warn!(message_id = %message_id, err = %e, "mark-read failed");
        }
    }

    pub fn start_typing(&self, receiver_id: &str) -> bool {
        !receiver_id.is_empty()
            && self.commands.is_connected()
            && self.commands.start_typing(receiver_id)
    }

    pub fn stop_typing(&self, receiver_id: &str) -> bool {
        !receiver_id.is_empty()
            && self.commands.is_connected()
            && self.commands.stop_typing(receiver_id)
    }

    /// Ask for the unread count: a push request when connected, otherwise a
    /// REST fetch applied directly.
    pub async fn refresh_unread_count(&self) -> Result<(), ApiError> {
        if self.commands.is_connected() && self.commands.get_unread_count() {
            return Ok(());
        }
        let epoch = self.state.lock().epoch;
        let count = match self.api.unread_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(err = %e, "unread count fetch failed");
                return Err(e);
            }
        };
        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.view.unread_count = count;
        }
        Ok(())
    }

    // -- Loads ------------------------------------------------------------

    /// Refetch the whole message log and rebuild the conversation list.
    pub async fn load_conversations(&self) -> Result<(), ApiError> {
        let (epoch, user) = {
            let state = self.state.lock();
            (state.epoch, state.view.current_user_id.clone())
        };
        let log = match self.api.user_messages().await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(err = %e, "loading conversations failed");
                return Err(e);
            }
        };

        let conversations = fold_conversations(&log, user.as_deref(), self.keying);
        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!("discarding conversation list from a cleared session");
            return Ok(());
        }
        tracing::debug!(conversations = conversations.len(), "conversations loaded");
        state.view.conversations = conversations;
        Ok(())
    }

    /// Load the transcript with `email` and acknowledge what is unread in it.
    pub async fn load_conversation(&self, email: &str) -> Result<(), ApiError> {
        let epoch = self.state.lock().epoch;
        let transcript = match self.api.conversation(email).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(email = %email, err = %e, "loading conversation failed");
                return Err(e);
            }
        };

        let unread: Vec<String> = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return Ok(());
            }
            let user = state.view.current_user_id.clone();
            let unread = transcript
                .iter()
                .filter(|m| m.is_unread_for(user.as_deref()))
                .map(|m| m.message_id.clone())
                .collect();
            state.view.current_messages = transcript;
            unread
        };

        for message_id in &unread {
            self.acknowledge(message_id).await;
        }
        let _ = self.refresh_unread_count().await;
        Ok(())
    }

    /// Open the conversation with `email`.
    pub async fn select_conversation(&self, email: &str) -> Result<(), ApiError> {
        {
            let mut state = self.state.lock();
            let known = state
                .view
                .conversations
                .iter()
                .find(|c| c.other_user_email.as_deref() == Some(email))
                .map(|c| (c.display_name().map(str::to_owned), c.other_user_id.clone()));
            let view = &mut state.view;
            view.selected_conversation = Some(email.to_owned());
            match known {
                Some((name, id)) => {
                    view.selected_conversation_name = name;
                    view.selected_conversation_id = Some(id);
                }
                None => {
                    view.selected_conversation_name = None;
                    view.selected_conversation_id = None;
                }
            }
        }
        self.load_conversation(email).await
    }

    // -- Inbound ----------------------------------------------------------

    /// Apply one bus event.
    pub async fn dispatch(&self, event: ServerEvent) {
        match event {
            ServerEvent::Connected => self.handle_connected(),
            ServerEvent::Disconnected => self.handle_disconnected(),
            ServerEvent::MessageReceived(message) => self.handle_message_received(message).await,
            ServerEvent::MessageSent(message) => self.handle_message_sent(message).await,
            ServerEvent::ReadReceipt(receipt) => self.handle_read_receipt(receipt).await,
            ServerEvent::TypingIndicator(indicator) => self.handle_typing_indicator(indicator),
            ServerEvent::UserStatus(status) => self.handle_user_status(status),
            ServerEvent::UnreadCountUpdate(update) => {
                self.handle_unread_count_update(update.unread_count)
            }
            ServerEvent::Error(err) => tracing::warn!(message = %err.message, "server error"),
            ServerEvent::SendFailed(frame) => {
                tracing::warn!(frame = %frame, "transport send failed");
            }
        }
    }

    pub fn handle_connected(&self) {
        self.state.lock().view.is_connected = true;
        tracing::info!("store connected");
        self.commands.get_unread_count();
    }

    pub fn handle_disconnected(&self) {
        self.state.lock().view.is_connected = false;
    }

    /// A message from another user. Messages for the open conversation are
    /// appended and acknowledged at once; others trigger an unread refresh.
    pub async fn handle_message_received(&self, message: Message) {
        let for_selected = {
            let mut state = self.state.lock();
            let view = &mut state.view;
            let by_email = view.selected_conversation.is_some()
                && view.selected_conversation == message.sender_email;
            let by_id = view.selected_conversation_id.as_deref() == Some(message.sender_id.as_str());
            let for_selected = by_email || by_id;
            if for_selected {
                view.push_unique(message.clone());
            }
            for_selected
        };

        if for_selected {
            self.acknowledge(&message.message_id).await;
        }
        let _ = self.load_conversations().await;
        if !for_selected {
            let _ = self.refresh_unread_count().await;
        }
    }

    /// Server echo of our own send.
    pub async fn handle_message_sent(&self, message: Message) {
        if !self.state.lock().view.push_unique(message) {
            tracing::debug!("sent message already in transcript");
        }
        let _ = self.load_conversations().await;
    }

    pub async fn handle_read_receipt(&self, receipt: ReadReceipt) {
        {
            let mut state = self.state.lock();
            if let Some(message) = state
                .view
                .current_messages
                .iter_mut()
                .find(|m| m.message_id == receipt.message_id)
            {
                message.mark_read_at(receipt.read_at.unwrap_or_else(Utc::now));
            }
        }
        let _ = self.load_conversations().await;
    }

    /// Typing starts expire after the typing timeout unless refreshed. A
    /// newer start or an explicit stop supersedes the pending expiry.
    pub fn handle_typing_indicator(&self, indicator: TypingIndicator) {
        let mut state = self.state.lock();
        if let Some(previous) = state.typing_timers.remove(&indicator.user_id) {
            previous.handle.abort();
        }

        if !indicator.typing {
            state.view.typing_users.remove(&indicator.user_id);
            return;
        }

        state.view.typing_users.insert(indicator.user_id.clone());
        state.timer_seq += 1;
        let generation = state.timer_seq;
        let timeout = self.typing_timeout;
        let shared = Arc::clone(&self.state);
        let user_id = indicator.user_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut state = shared.lock();
            if state.typing_timers.get(&user_id).map(|t| t.generation) == Some(generation) {
                state.typing_timers.remove(&user_id);
                state.view.typing_users.remove(&user_id);
            }
        });
        state
            .typing_timers
            .insert(indicator.user_id, TypingTimer { generation, handle: task.abort_handle() });
    }

    pub fn handle_user_status(&self, status: UserStatus) {
        let mut state = self.state.lock();
        if status.is_online() {
            state.view.online_users.insert(status.user_id);
        } else {
            state.view.online_users.remove(&status.user_id);
        }
    }

    pub fn handle_unread_count_update(&self, unread_count: u64) {
        tracing::debug!(unread_count, "unread count update");
        self.state.lock().view.unread_count = unread_count;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
