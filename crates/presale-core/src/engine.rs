//! ConversationEngine trait definition.
//!
//! The contract consumed by the run coordinator and the orchestrator.
//! The concrete implementation in presale-infra talks to the OpenAI
//! Assistants API; tests script this trait directly.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition), same
//! pattern as the repository traits.

use presale_types::engine::{AssistantInfo, CreateAssistant, ThreadAuthor, ThreadMessage, ThreadRun};
use presale_types::error::EngineError;

/// External conversational engine: threads, runs, messages, assistants.
///
/// Run and message listings are ordered newest-first, matching the
/// external service's `order=desc` listings.
pub trait ConversationEngine: Send + Sync {
    /// Create a new conversation thread, returning its identifier.
    fn create_thread(
        &self,
    ) -> impl std::future::Future<Output = Result<String, EngineError>> + Send;

    /// List the most recent runs on a thread, newest first.
    fn list_recent_runs(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ThreadRun>, EngineError>> + Send;

    /// Start a run of the given assistant on a thread.
    fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> impl std::future::Future<Output = Result<ThreadRun, EngineError>> + Send;

    /// Fetch the current state of a run.
    fn get_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> impl std::future::Future<Output = Result<ThreadRun, EngineError>> + Send;

    /// Append a message to a thread, returning the engine message id.
    fn post_message(
        &self,
        thread_id: &str,
        author: ThreadAuthor,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, EngineError>> + Send;

    /// List the most recent messages on a thread, newest first.
    fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ThreadMessage>, EngineError>> + Send;

    /// List registered assistants with their metadata, newest first.
    fn list_assistants(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<AssistantInfo>, EngineError>> + Send;

    /// Register a new assistant.
    fn create_assistant(
        &self,
        request: &CreateAssistant,
    ) -> impl std::future::Future<Output = Result<AssistantInfo, EngineError>> + Send;
}
