//! Chat, message, and deal types for Presale.
//!
//! A chat pairs one blogger with exactly two external conversation threads
//! (manager and parser), created together and immutable once set. Messages
//! are append-only and ordered by creation timestamp. A deal is the
//! structured negotiation state incrementally inferred from the chat,
//! at most one per chat, merged field-by-field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sender of a persisted chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Manager,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Manager => write!(f, "manager"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "manager" => Ok(Sender::Manager),
            other => Err(format!("invalid message sender: '{other}'")),
        }
    }
}

/// A negotiation chat owned by a single blogger.
///
/// The two thread identifiers reference conversation contexts held by the
/// external engine. They are created together with the chat row and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub blogger_id: Uuid,
    pub manager_thread_id: String,
    pub parser_thread_id: String,
    pub created_at: DateTime<Utc>,
}

/// A message to append to a chat's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub sender: Sender,
    pub content: String,
    /// Identifier of the mirrored message inside the external engine
    /// thread, when the message was posted there.
    pub engine_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub engine_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One page of a chat's message history, ascending by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesPage {
    pub messages: Vec<MessageRecord>,
    pub total_count: i64,
}

/// Structured negotiation state for a chat. At most one per chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub price_usd: Option<f64>,
    pub availability: Option<String>,
    pub discounts: Option<String>,
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial deal fields extracted from a parser reply.
///
/// Every field is independently optional. Merging a patch into a deal
/// overwrites only the fields that are present; a previously known field
/// is never regressed to unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DealPatch {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.price_usd.is_none()
            && self.availability.is_none()
            && self.discounts.is_none()
            && self.status.is_none()
    }
}
