//! OpenAI Assistants API wire types.
//!
//! Provider-specific request/response structures for HTTP communication
//! with the Assistants v2 API. These are NOT the normalized engine types
//! from presale-types; conversion happens in the client.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use presale_types::engine::{
    AssistantInfo, ContentBlock, RunStatus, ThreadAuthor, ThreadMessage, ThreadRun,
};

/// Response to `POST /v1/threads`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

/// Paginated listing envelope used by runs, messages, and assistants.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
}

/// A run as returned by the API. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: RunStatus,
}

impl From<RunObject> for ThreadRun {
    fn from(run: RunObject) -> Self {
        ThreadRun { id: run.id, status: run.status }
    }
}

/// Request body for `POST /v1/threads/{id}/runs`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

/// Request body for `POST /v1/threads/{id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: ThreadAuthor,
    pub content: &'a str,
}

/// A thread message as returned by the API.
///
/// Content blocks deserialize straight into the normalized
/// [`ContentBlock`], which accepts both the structured `{text: {value}}`
/// shape and a bare string.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: ThreadAuthor,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        ThreadMessage { id: message.id, author: message.role, content: message.content }
    }
}

/// An assistant as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl From<AssistantObject> for AssistantInfo {
    fn from(assistant: AssistantObject) -> Self {
        AssistantInfo {
            id: assistant.id,
            name: assistant.name.unwrap_or_default(),
            metadata: assistant.metadata,
        }
    }
}

/// Request body for `POST /v1/assistants`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest<'a> {
    pub name: &'a str,
    pub instructions: &'a str,
    pub temperature: f64,
    pub model: &'a str,
    pub metadata: &'a HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_object_parses_api_content_shape() {
        let json = r#"{
            "id": "msg_abc",
            "role": "assistant",
            "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
        }"#;
        let message: MessageObject = serde_json::from_str(json).unwrap();
        let normalized = ThreadMessage::from(message);
        assert_eq!(normalized.author, ThreadAuthor::Assistant);
        assert_eq!(normalized.first_text(), "hello");
    }

    #[test]
    fn run_object_tolerates_unmodeled_status() {
        let run: RunObject =
            serde_json::from_str(r#"{"id": "run_1", "status": "incomplete"}"#).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
    }

    #[test]
    fn assistant_object_defaults_missing_fields() {
        let assistant: AssistantObject = serde_json::from_str(r#"{"id": "asst_1"}"#).unwrap();
        let info = AssistantInfo::from(assistant);
        assert_eq!(info.name, "");
        assert!(info.metadata.is_empty());
    }
}
