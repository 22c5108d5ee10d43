// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation list derived from the flat message log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ConversationKey;
use crate::model::{Message, Participant};

/// One row of the conversation list: the other participant plus a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub other_user_email: Option<String>,
    pub other_user_name: Option<String>,
    pub other_user_id: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: u64,
}

impl Conversation {
    /// Name to show for the other participant, falling back to the email.
    pub fn display_name(&self) -> Option<&str> {
        self.other_user_name.as_deref().or(self.other_user_email.as_deref())
    }
}

fn key_of(other: &Participant, keying: ConversationKey) -> String {
    match keying {
        ConversationKey::Email => other.email.clone().unwrap_or_else(|| other.id.clone()),
        ConversationKey::ParticipantId => other.id.clone(),
    }
}

/// Fold `messages` into one [`Conversation`] per other participant.
///
/// The first message seen for a participant seeds its row; later messages
/// replace the summary only when strictly newer. Unread counts messages
/// addressed to `current_user_id` with no read time. Rows come back newest
/// first.
pub fn fold_conversations(
    messages: &[Message],
    current_user_id: Option<&str>,
    keying: ConversationKey,
) -> Vec<Conversation> {
    let mut rows: Vec<Conversation> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for message in messages {
        let other = message.other_participant(current_user_id);
        let slot = *by_key.entry(key_of(&other, keying)).or_insert_with(|| {
            rows.push(Conversation {
                other_user_email: other.email.clone(),
                other_user_name: other.name.clone(),
                other_user_id: other.id.clone(),
                last_message: message.content.clone(),
                last_message_time: message.created_at,
                unread_count: 0,
            });
            rows.len() - 1
        });

        let row = &mut rows[slot];
        if message.created_at > row.last_message_time {
            row.last_message = message.content.clone();
            row.last_message_time = message.created_at;
        }
        if message.is_unread_for(current_user_id) {
            row.unread_count += 1;
        }
    }

    rows.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    rows
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
