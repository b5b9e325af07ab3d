//! Scripted in-memory doubles for the core traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use presale_types::assistant::{AssistantCatalog, AssistantRole, AssistantSpec};
use presale_types::chat::{Chat, Deal, MessageRecord, MessagesPage, NewMessage};
use presale_types::engine::{
    AssistantInfo, ContentBlock, CreateAssistant, RunStatus, ThreadAuthor, ThreadMessage,
    ThreadRun,
};
use presale_types::error::{AuthError, EngineError, RepositoryError};
use presale_types::identity::{PartyRole, VerifiedParty};

use crate::engine::ConversationEngine;
use crate::repository::RecordStore;
use crate::verifier::IdentityVerifier;

/// A catalog with the production descriptors and placeholder instructions.
pub fn catalog() -> AssistantCatalog {
    let spec = |role: AssistantRole, display_name: &str| AssistantSpec {
        role,
        display_name: display_name.to_string(),
        version: "2.0".to_string(),
        temperature: 0.9,
        model: "gpt-4o".to_string(),
        instructions: format!("{display_name} test instructions"),
    };
    AssistantCatalog::new(vec![
        spec(AssistantRole::Manager, "Manager Assistant"),
        spec(AssistantRole::Parser, "Parser Assistant"),
    ])
    .unwrap()
}

/// One observable engine call, for ordering assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    CreateThread,
    PostMessage { thread_id: String, author: ThreadAuthor },
    CreateRun { thread_id: String },
}

struct StubRun {
    id: String,
    status: RunStatus,
    remaining_polls: u32,
}

#[derive(Default)]
struct ThreadState {
    messages: Vec<ThreadMessage>,
    runs: Vec<StubRun>,
    /// Text posted as an assistant message when a run completes.
    reply: Option<String>,
    held_busy: bool,
    poll_delay: u32,
    never_complete: bool,
    saw_concurrent: bool,
}

#[derive(Default)]
struct StubState {
    threads: HashMap<String, ThreadState>,
    assistants: Vec<AssistantInfo>,
    created: Vec<CreateAssistant>,
    list_assistant_calls: usize,
    fail_next_list: Option<String>,
    ops: Vec<EngineOp>,
}

/// Scripted [`ConversationEngine`] backed by in-memory thread state.
///
/// A run completes on the `get_run` poll after its configured delay
/// elapses; completion appends the thread's scripted reply, if any, as an
/// assistant message.
#[derive(Default)]
pub struct StubEngine {
    state: Mutex<StubState>,
    ids: AtomicUsize,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.ids.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    pub fn seed_assistant(&self, assistant: AssistantInfo) {
        self.lock().assistants.push(assistant);
    }

    pub fn fail_next_list_assistants(&self, message: &str) {
        self.lock().fail_next_list = Some(message.to_string());
    }

    pub fn created_assistants(&self) -> Vec<CreateAssistant> {
        self.lock().created.clone()
    }

    pub fn list_assistant_calls(&self) -> usize {
        self.lock().list_assistant_calls
    }

    /// Script the assistant reply appended when a run on this thread
    /// completes.
    pub fn set_reply(&self, thread_id: &str, text: &str) {
        self.lock().threads.entry(thread_id.to_string()).or_default().reply =
            Some(text.to_string());
    }

    /// Make the thread report an active run forever.
    pub fn hold_thread_busy(&self, thread_id: &str) {
        self.lock().threads.entry(thread_id.to_string()).or_default().held_busy = true;
    }

    /// Keep runs on this thread in progress for `polls` `get_run` calls.
    pub fn delay_run_completion(&self, thread_id: &str, polls: u32) {
        self.lock().threads.entry(thread_id.to_string()).or_default().poll_delay = polls;
    }

    pub fn never_complete_runs(&self, thread_id: &str) {
        self.lock().threads.entry(thread_id.to_string()).or_default().never_complete = true;
    }

    pub fn runs_created(&self, thread_id: &str) -> usize {
        self.lock().threads.get(thread_id).map_or(0, |t| t.runs.len())
    }

    /// True when a run was created while another was still active.
    pub fn saw_concurrent_runs(&self, thread_id: &str) -> bool {
        self.lock().threads.get(thread_id).is_some_and(|t| t.saw_concurrent)
    }

    pub fn thread_messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.lock().threads.get(thread_id).map_or_else(Vec::new, |t| t.messages.clone())
    }

    pub fn threads_created(&self) -> usize {
        self.lock().threads.len()
    }

    pub fn ops(&self) -> Vec<EngineOp> {
        self.lock().ops.clone()
    }
}

impl ConversationEngine for StubEngine {
    async fn create_thread(&self) -> Result<String, EngineError> {
        let id = self.next_id("thread");
        let mut state = self.lock();
        state.threads.insert(id.clone(), ThreadState::default());
        state.ops.push(EngineOp::CreateThread);
        Ok(id)
    }

    async fn list_recent_runs(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<ThreadRun>, EngineError> {
        let state = self.lock();
        let thread = state.threads.get(thread_id).ok_or_else(|| EngineError::Provider {
            message: format!("no such thread: {thread_id}"),
        })?;
        if thread.held_busy {
            return Ok(vec![ThreadRun {
                id: "run_held".to_string(),
                status: RunStatus::InProgress,
            }]);
        }
        Ok(thread
            .runs
            .iter()
            .rev()
            .take(limit as usize)
            .map(|run| ThreadRun { id: run.id.clone(), status: run.status })
            .collect())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        _assistant_id: &str,
    ) -> Result<ThreadRun, EngineError> {
        let id = self.next_id("run");
        let mut state = self.lock();
        let thread = state.threads.get_mut(thread_id).ok_or_else(|| EngineError::Provider {
            message: format!("no such thread: {thread_id}"),
        })?;
        if thread.held_busy || thread.runs.iter().any(|run| run.status.is_active()) {
            thread.saw_concurrent = true;
        }
        let run = StubRun {
            id: id.clone(),
            status: RunStatus::InProgress,
            remaining_polls: thread.poll_delay,
        };
        thread.runs.push(run);
        let op = EngineOp::CreateRun { thread_id: thread_id.to_string() };
        state.ops.push(op);
        Ok(ThreadRun { id, status: RunStatus::InProgress })
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun, EngineError> {
        let mut state = self.lock();
        let message_id = self.next_id("msg");
        let thread = state.threads.get_mut(thread_id).ok_or_else(|| EngineError::Provider {
            message: format!("no such thread: {thread_id}"),
        })?;
        if thread.never_complete {
            return Ok(ThreadRun { id: run_id.to_string(), status: RunStatus::InProgress });
        }
        let mut completed_now = false;
        let status = {
            let run = thread.runs.iter_mut().find(|run| run.id == run_id).ok_or_else(|| {
                EngineError::Provider { message: format!("no such run: {run_id}") }
            })?;
            if run.status.is_active() {
                if run.remaining_polls > 0 {
                    run.remaining_polls -= 1;
                } else {
                    run.status = RunStatus::Completed;
                    completed_now = true;
                }
            }
            run.status
        };
        if completed_now {
            if let Some(text) = thread.reply.clone() {
                thread.messages.push(ThreadMessage {
                    id: message_id,
                    author: ThreadAuthor::Assistant,
                    content: vec![ContentBlock::structured(text)],
                });
            }
        }
        Ok(ThreadRun { id: run_id.to_string(), status })
    }

    async fn post_message(
        &self,
        thread_id: &str,
        author: ThreadAuthor,
        text: &str,
    ) -> Result<String, EngineError> {
        let id = self.next_id("msg");
        let mut state = self.lock();
        let thread = state.threads.get_mut(thread_id).ok_or_else(|| EngineError::Provider {
            message: format!("no such thread: {thread_id}"),
        })?;
        thread.messages.push(ThreadMessage {
            id: id.clone(),
            author,
            content: vec![ContentBlock::structured(text)],
        });
        let op = EngineOp::PostMessage { thread_id: thread_id.to_string(), author };
        state.ops.push(op);
        Ok(id)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>, EngineError> {
        let state = self.lock();
        let thread = state.threads.get(thread_id).ok_or_else(|| EngineError::Provider {
            message: format!("no such thread: {thread_id}"),
        })?;
        Ok(thread.messages.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn list_assistants(&self, limit: u32) -> Result<Vec<AssistantInfo>, EngineError> {
        let mut state = self.lock();
        state.list_assistant_calls += 1;
        if let Some(message) = state.fail_next_list.take() {
            return Err(EngineError::Provider { message });
        }
        Ok(state.assistants.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistant,
    ) -> Result<AssistantInfo, EngineError> {
        let id = self.next_id("asst");
        let mut state = self.lock();
        state.created.push(request.clone());
        let info = AssistantInfo {
            id,
            name: request.name.clone(),
            metadata: request.metadata.clone(),
        };
        state.assistants.push(info.clone());
        Ok(info)
    }
}

/// In-memory [`RecordStore`] with the same merge and idempotency rules as
/// the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<Vec<MessageRecord>>,
    deals: Mutex<Vec<Deal>>,
    party_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`RecordStore::chat_by_party`] has been called.
    pub fn party_lookups(&self) -> usize {
        self.party_lookups.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    async fn chat_by_party(&self, party_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        self.party_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .find(|chat| chat.blogger_id == *party_id)
            .cloned())
    }

    async fn chat_by_id(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .find(|chat| chat.id == *chat_id)
            .cloned())
    }

    async fn create_chat(
        &self,
        party_id: &Uuid,
        manager_thread_id: &str,
        parser_thread_id: &str,
    ) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.lock().unwrap();
        if let Some(existing) = chats.iter().find(|chat| chat.blogger_id == *party_id) {
            return Ok(existing.clone());
        }
        let chat = Chat {
            id: Uuid::new_v4(),
            blogger_id: *party_id,
            manager_thread_id: manager_thread_id.to_string(),
            parser_thread_id: parser_thread_id.to_string(),
            created_at: Utc::now(),
        };
        chats.push(chat.clone());
        Ok(chat)
    }

    async fn append_message(&self, message: &NewMessage) -> Result<MessageRecord, RepositoryError> {
        let record = MessageRecord {
            id: Uuid::new_v4(),
            chat_id: message.chat_id,
            sender: message.sender,
            content: message.content.clone(),
            engine_message_id: message.engine_message_id.clone(),
            created_at: message.created_at,
        };
        self.messages.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn page_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<MessagesPage, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        let mut in_chat: Vec<MessageRecord> = messages
            .iter()
            .filter(|message| message.chat_id == *chat_id)
            .cloned()
            .collect();
        in_chat.sort_by_key(|message| message.created_at);
        let total_count = in_chat.len() as i64;
        let page = in_chat
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok(MessagesPage { messages: page, total_count })
    }

    async fn upsert_deal(
        &self,
        chat_id: &Uuid,
        patch: &presale_types::chat::DealPatch,
    ) -> Result<Deal, RepositoryError> {
        let mut deals = self.deals.lock().unwrap();
        if let Some(deal) = deals.iter_mut().find(|deal| deal.chat_id == *chat_id) {
            deal.price_usd = patch.price_usd.or(deal.price_usd);
            deal.availability = patch.availability.clone().or(deal.availability.take());
            deal.discounts = patch.discounts.clone().or(deal.discounts.take());
            deal.status = patch.status.clone().or(deal.status.take());
            deal.updated_at = Utc::now();
            return Ok(deal.clone());
        }
        let deal = Deal {
            id: Uuid::new_v4(),
            chat_id: *chat_id,
            price_usd: patch.price_usd,
            availability: patch.availability.clone(),
            discounts: patch.discounts.clone(),
            status: patch.status.clone(),
            updated_at: Utc::now(),
        };
        deals.push(deal.clone());
        Ok(deal)
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, RepositoryError> {
        Ok(self.deals.lock().unwrap().clone())
    }
}

/// Token-to-party table standing in for the identity provider.
#[derive(Default)]
pub struct StaticVerifier {
    parties: Mutex<HashMap<String, VerifiedParty>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, token: &str, party_id: Uuid, role: PartyRole) {
        self.parties
            .lock()
            .unwrap()
            .insert(token.to_string(), VerifiedParty { party_id, role });
    }
}

impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedParty, AuthError> {
        self.parties
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::TokenRejected("unknown token".to_string()))
    }
}
