// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message and user records as the backend serves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A direct message between two users.
///
/// Only `read_at` ever changes after creation, and it never precedes
/// `created_at`; decoded values are clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMessage")]
pub struct Message {
    pub message_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_email: Option<String>,
    pub receiver_email: Option<String>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub content: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "timestamp::option::serialize")]
    pub read_at: Option<DateTime<Utc>>,
}

/// A message exactly as the backend sends it.
#[derive(Deserialize)]
struct WireMessage {
    message_id: String,
    sender_id: String,
    receiver_id: String,
    #[serde(default)]
    sender_email: Option<String>,
    #[serde(default)]
    receiver_email: Option<String>,
    #[serde(default)]
    sender_name: Option<String>,
    #[serde(default)]
    receiver_name: Option<String>,
    content: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    read_at: Option<DateTime<Utc>>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let created_at = wire.created_at;
        Self {
            message_id: wire.message_id,
            sender_id: wire.sender_id,
            receiver_id: wire.receiver_id,
            sender_email: wire.sender_email,
            receiver_email: wire.receiver_email,
            sender_name: wire.sender_name,
            receiver_name: wire.receiver_name,
            content: wire.content,
            created_at,
            read_at: wire.read_at.map(|read_at| read_at.max(created_at)),
        }
    }
}

/// The participant on the far side of a message, from one user's viewpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Message {
    /// True when this message is addressed to `user_id` and has not been read.
    pub fn is_unread_for(&self, user_id: Option<&str>) -> bool {
        self.read_at.is_none() && user_id == Some(self.receiver_id.as_str())
    }

    /// The other party of this message as seen by `current_user_id`.
    pub fn other_participant(&self, current_user_id: Option<&str>) -> Participant {
        if current_user_id == Some(self.sender_id.as_str()) {
            Participant {
                id: self.receiver_id.clone(),
                email: self.receiver_email.clone(),
                name: self.receiver_name.clone(),
            }
        } else {
            Participant {
                id: self.sender_id.clone(),
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            }
        }
    }

    /// Record a read timestamp, never earlier than the creation time.
    pub fn mark_read_at(&mut self, read_at: DateTime<Utc>) {
        self.read_at = Some(read_at.max(self.created_at));
    }
}

/// The authenticated user returned by the identity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub fname: Option<String>,
    #[serde(default)]
    pub lname: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        let first = self.fname.as_deref().unwrap_or("");
        let last = self.lname.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_owned()
    }
}

/// Lenient timestamp (de)serialization.
///
/// The backend emits `isoformat()` strings which may or may not carry an
/// offset; naive values are taken as UTC. A null creation time decodes as the
/// Unix epoch.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => parse(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            None => Ok(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => s.serialize_str(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
