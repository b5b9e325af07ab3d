//! Per-thread run coordination.
//!
//! The external engine rejects a message append or a new run while a
//! prior run on the same thread is still active, so every operation here
//! first drains the thread: poll its most recent run until none is
//! active, bounded by a deadline. Draining alone is only best-effort
//! serialization; a process-local per-thread-id async lock hardens it
//! into an actual mutual-exclusion guarantee for this process.
//!
//! Timeouts surface as `EngineError::ThreadBusy` (drain) or
//! `EngineError::RunTimeout` (completion); nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use presale_types::assistant::AssistantRole;
use presale_types::engine::{RunStatus, ThreadAuthor, ThreadMessage};
use presale_types::error::{EngineError, OrchestratorError};

use crate::assistant::AssistantCache;
use crate::engine::ConversationEngine;
use crate::poll::{poll_until, Poll};

/// How many thread messages to scan for the latest assistant reply.
const REPLY_SCAN_LIMIT: u32 = 20;

/// Polling cadence and deadlines for the two wait stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Deadline for a prior run to leave the active states.
    pub drain_deadline: Duration,
    /// Deadline for a created run to reach a terminal state.
    pub run_deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            drain_deadline: Duration::from_secs(30),
            run_deadline: Duration::from_secs(60),
        }
    }
}

/// The latest assistant-authored reply after a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantReply {
    /// Engine id of the reply message, absent when the run produced none.
    pub message_id: Option<String>,
    /// Content blocks of the reply; empty when the run produced none.
    pub content: Vec<presale_types::engine::ContentBlock>,
}

impl AssistantReply {
    /// Text of the first content block, or empty.
    pub fn first_text(&self) -> &str {
        self.content.first().map(|b| b.text()).unwrap_or("")
    }
}

/// Serializes invocations against external conversation threads.
pub struct RunCoordinator<E> {
    engine: Arc<E>,
    cache: Arc<AssistantCache<E>>,
    poll: PollConfig,
    thread_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<E: ConversationEngine> RunCoordinator<E> {
    pub fn new(engine: Arc<E>, cache: Arc<AssistantCache<E>>, poll: PollConfig) -> Self {
        Self { engine, cache, poll, thread_locks: DashMap::new() }
    }

    /// Append a user-authored message to a thread, draining first.
    /// Returns the engine message id.
    pub async fn post_user_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<String, OrchestratorError> {
        self.post_message(thread_id, ThreadAuthor::User, text).await
    }

    /// Append a pre-written assistant-authored message (the welcome text)
    /// to a thread, draining first. Returns the engine message id.
    pub async fn post_assistant_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<String, OrchestratorError> {
        self.post_message(thread_id, ThreadAuthor::Assistant, text).await
    }

    async fn post_message(
        &self,
        thread_id: &str,
        author: ThreadAuthor,
        text: &str,
    ) -> Result<String, OrchestratorError> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;
        self.drain(thread_id).await?;
        let id = self.engine.post_message(thread_id, author, text).await?;
        tracing::debug!(thread_id, engine_message_id = %id, "posted thread message");
        Ok(id)
    }

    /// Run an assistant on a thread and return its latest reply.
    ///
    /// Drains the thread, resolves the assistant identity, creates a run,
    /// polls it to a terminal state, then fetches the newest
    /// assistant-authored message. An absent reply is an empty
    /// [`AssistantReply`], not an error.
    pub async fn run_assistant(
        &self,
        thread_id: &str,
        role: AssistantRole,
    ) -> Result<AssistantReply, OrchestratorError> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        self.drain(thread_id).await?;
        let assistant_id = self.cache.resolve(role).await?;
        let run = self.engine.create_run(thread_id, &assistant_id).await?;
        tracing::debug!(thread_id, run_id = %run.id, %role, "created run");

        let run_id = run.id.as_str();
        let terminal = poll_until(self.poll.interval, self.poll.run_deadline, || async move {
            let run = self.engine.get_run(thread_id, run_id).await?;
            if run.status.is_terminal() {
                Ok::<_, EngineError>(Poll::Ready(run))
            } else {
                Ok(Poll::Pending)
            }
        })
        .await?;

        let Some(finished) = terminal else {
            return Err(EngineError::RunTimeout {
                run_id: run.id,
                waited_secs: self.poll.run_deadline.as_secs(),
            }
            .into());
        };
        if finished.status != RunStatus::Completed {
            tracing::warn!(thread_id, run_id = %finished.id, status = %finished.status, "run ended without completing");
        }

        let messages = self.engine.list_messages(thread_id, REPLY_SCAN_LIMIT).await?;
        Ok(latest_assistant_reply(&messages))
    }

    /// Wait until the thread's most recent run is no longer active.
    async fn drain(&self, thread_id: &str) -> Result<(), OrchestratorError> {
        let free = poll_until(self.poll.interval, self.poll.drain_deadline, || async move {
            let runs = self.engine.list_recent_runs(thread_id, 1).await?;
            let busy = runs.first().is_some_and(|run| run.status.is_active());
            if busy { Ok::<_, EngineError>(Poll::Pending) } else { Ok(Poll::Ready(())) }
        })
        .await?;

        match free {
            Some(()) => Ok(()),
            None => Err(EngineError::ThreadBusy {
                thread_id: thread_id.to_string(),
                waited_secs: self.poll.drain_deadline.as_secs(),
            }
            .into()),
        }
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let entry = self
            .thread_locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }
}

/// Newest assistant-authored message from a newest-first listing.
fn latest_assistant_reply(messages: &[ThreadMessage]) -> AssistantReply {
    messages
        .iter()
        .find(|m| m.author == ThreadAuthor::Assistant)
        .map(|m| AssistantReply { message_id: Some(m.id.clone()), content: m.content.clone() })
        .unwrap_or_default()
}
