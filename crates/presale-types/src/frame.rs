//! WebSocket frame shapes.
//!
//! Clients send JSON text frames tagged by `type`. The first frame of a
//! connection is untyped and carries only the access token; it is parsed
//! separately from [`ClientFrame`].
//!
//! Outbound frames are serialized once and fanned out as text; the
//! type-qualified error frame (`<type>_error`) is built ad hoc because its
//! tag is dynamic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{Deal, DealPatch, MessageRecord, Sender};

/// Default page size for `get_existing_messages`.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// The untyped first frame of a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthFrame {
    pub access_token: Option<String>,
}

/// Typed frames accepted after authentication.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ChatMessage {
        content: String,
    },
    GetDeals,
    GetExistingMessages {
        limit: Option<i64>,
        offset: Option<i64>,
    },
}

/// Frames sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Echo of a user message or a manager reply.
    ChatMessage {
        chat_id: Uuid,
        sender: Sender,
        content: String,
        created_at: DateTime<Utc>,
        engine_message_id: Option<String>,
    },
    DealsList {
        deals: Vec<Deal>,
    },
    MessagesPage {
        messages: Vec<MessageRecord>,
        total_count: i64,
        limit: i64,
        offset: i64,
        chat_id: Uuid,
    },
    /// Broadcast to marketer sessions when a parser reply updated a deal.
    DealUpdate {
        chat_id: Uuid,
        deal_update: DealPatch,
    },
    /// Generic error, e.g. for an unrecognized frame type.
    Error {
        error: String,
    },
}

impl ServerFrame {
    /// Serialize to the wire text. Frame shapes contain no non-serializable
    /// values, so this cannot fail in practice.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","error":"frame serialization failed: {e}"}}"#)
        })
    }
}

/// Build a type-qualified error frame for a failed typed frame, e.g.
/// `{"type":"chat_message_error","error":"..."}`.
pub fn typed_error_frame(frame_type: &str, error: &str) -> String {
    serde_json::json!({
        "type": format!("{frame_type}_error"),
        "error": error,
    })
    .to_string()
}
