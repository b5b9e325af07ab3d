//! Engine-facing wire types shared by the orchestration core and the
//! concrete conversation-engine client.
//!
//! These are provider-agnostic: the core only ever sees normalized runs,
//! thread messages, and content blocks. Provider-specific request/response
//! structs live in presale-infra.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status of a run as reported by the external engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// Forward-compat catch-all for statuses this service does not model.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// A thread with an active run rejects new messages and new runs.
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    /// Terminal states: the run will make no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One execution of an assistant against a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRun {
    pub id: String,
    pub status: RunStatus,
}

/// Author of a message inside an engine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadAuthor {
    User,
    Assistant,
}

/// One content block of an engine thread message.
///
/// Engine replies arrive in two shapes: a structured object carrying a
/// nested text value, or a bare string. Both are normalized here, at the
/// boundary, so nothing downstream branches on shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Structured { text: TextValue },
    Plain(String),
}

/// The nested text value of a structured content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

impl ContentBlock {
    /// The block's text, whichever shape it arrived in.
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Structured { text } => &text.value,
            ContentBlock::Plain(value) => value,
        }
    }

    /// Convenience constructor for a structured text block.
    pub fn structured(value: impl Into<String>) -> Self {
        ContentBlock::Structured { text: TextValue { value: value.into() } }
    }
}

/// A message stored inside an engine thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub author: ThreadAuthor,
    pub content: Vec<ContentBlock>,
}

impl ThreadMessage {
    /// Text of the first content block, or empty when the message has none.
    pub fn first_text(&self) -> &str {
        self.content.first().map(ContentBlock::text).unwrap_or("")
    }
}

/// An assistant registered with the external engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request to register a new assistant with the external engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAssistant {
    pub name: String,
    pub instructions: String,
    pub temperature: f64,
    pub model: String,
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_classification() {
        assert!(RunStatus::Queued.is_active());
        assert!(RunStatus::InProgress.is_active());
        assert!(!RunStatus::RequiresAction.is_active());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Expired.is_terminal());
        assert!(!RunStatus::Cancelling.is_terminal());
    }

    #[test]
    fn run_status_unknown_variant_absorbs_new_statuses() {
        let status: RunStatus = serde_json::from_str("\"incomplete\"").unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert!(!status.is_active());
        assert!(!status.is_terminal());
    }

    #[test]
    fn content_block_accepts_both_shapes() {
        let structured: ContentBlock =
            serde_json::from_str(r#"{"text": {"value": "hello"}}"#).unwrap();
        assert_eq!(structured.text(), "hello");

        let plain: ContentBlock = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(plain.text(), "hello");
    }

    #[test]
    fn thread_message_first_text_defaults_to_empty() {
        let msg = ThreadMessage {
            id: "msg_1".to_string(),
            author: ThreadAuthor::Assistant,
            content: vec![],
        };
        assert_eq!(msg.first_text(), "");
    }
}
