//! OpenAiEngine -- concrete [`ConversationEngine`] for the OpenAI
//! Assistants v2 API.
//!
//! Every request carries the `OpenAI-Beta: assistants=v2` header along
//! with bearer authentication. The API key is wrapped in
//! [`secrecy::SecretString`] and is never logged or included in Debug
//! output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use presale_core::engine::ConversationEngine;
use presale_types::engine::{
    AssistantInfo, CreateAssistant, ThreadAuthor, ThreadMessage, ThreadRun,
};
use presale_types::error::EngineError;

use super::types::{
    AssistantObject, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, ListEnvelope,
    MessageObject, RunObject, ThreadObject,
};

/// OpenAI Assistants engine client.
pub struct OpenAiEngine {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

// OpenAiEngine intentionally does not derive Debug; the SecretString field
// already refuses to print, but omitting Debug keeps the whole struct out
// of accidental log output.

impl OpenAiEngine {
    /// The Assistants API version header value.
    const BETA_HEADER: &'static str = "assistants=v2";

    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self { client, api_key, base_url: "https://api.openai.com".to_string() }
    }

    /// Override the base URL (testing, proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .header("OpenAI-Beta", Self::BETA_HEADER)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, EngineError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| EngineError::Provider { message: format!("HTTP request failed: {e}") })?;
        Self::parse(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, EngineError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::Provider { message: format!("HTTP request failed: {e}") })?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EngineError::Provider { message: format!("HTTP {status}: {error_body}") });
        }
        response
            .json()
            .await
            .map_err(|e| EngineError::Deserialization(format!("failed to parse response: {e}")))
    }
}

impl ConversationEngine for OpenAiEngine {
    async fn create_thread(&self) -> Result<String, EngineError> {
        let thread: ThreadObject = self.post("/v1/threads", &serde_json::json!({})).await?;
        tracing::debug!(thread_id = %thread.id, "created engine thread");
        Ok(thread.id)
    }

    async fn list_recent_runs(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<ThreadRun>, EngineError> {
        let envelope: ListEnvelope<RunObject> = self
            .get(&format!("/v1/threads/{thread_id}/runs?limit={limit}&order=desc"))
            .await?;
        Ok(envelope.data.into_iter().map(ThreadRun::from).collect())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<ThreadRun, EngineError> {
        let run: RunObject = self
            .post(
                &format!("/v1/threads/{thread_id}/runs"),
                &CreateRunRequest { assistant_id },
            )
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun, EngineError> {
        let run: RunObject = self.get(&format!("/v1/threads/{thread_id}/runs/{run_id}")).await?;
        Ok(run.into())
    }

    async fn post_message(
        &self,
        thread_id: &str,
        author: ThreadAuthor,
        text: &str,
    ) -> Result<String, EngineError> {
        let message: MessageObject = self
            .post(
                &format!("/v1/threads/{thread_id}/messages"),
                &CreateMessageRequest { role: author, content: text },
            )
            .await?;
        Ok(message.id)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>, EngineError> {
        let envelope: ListEnvelope<MessageObject> = self
            .get(&format!("/v1/threads/{thread_id}/messages?limit={limit}&order=desc"))
            .await?;
        Ok(envelope.data.into_iter().map(ThreadMessage::from).collect())
    }

    async fn list_assistants(&self, limit: u32) -> Result<Vec<AssistantInfo>, EngineError> {
        let envelope: ListEnvelope<AssistantObject> =
            self.get(&format!("/v1/assistants?limit={limit}&order=desc")).await?;
        Ok(envelope.data.into_iter().map(AssistantInfo::from).collect())
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistant,
    ) -> Result<AssistantInfo, EngineError> {
        let assistant: AssistantObject = self
            .post(
                "/v1/assistants",
                &CreateAssistantRequest {
                    name: &request.name,
                    instructions: &request.instructions,
                    temperature: request.temperature,
                    model: &request.model,
                    metadata: &request.metadata,
                },
            )
            .await?;
        Ok(assistant.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_override_applies() {
        let engine = OpenAiEngine::new(SecretString::from("test-key-not-real"))
            .with_base_url("http://localhost:8081".to_string());
        assert_eq!(engine.url("/v1/threads"), "http://localhost:8081/v1/threads");
    }

    #[test]
    fn create_message_request_serializes_role_lowercase() {
        let body = CreateMessageRequest { role: ThreadAuthor::Assistant, content: "hi" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }
}
