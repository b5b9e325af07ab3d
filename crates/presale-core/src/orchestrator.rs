//! Top-level per-frame orchestration.
//!
//! One orchestrator serves every session. The transport layer feeds it
//! frames in order, one session worker at a time per session: first the
//! untyped handshake frame through [`ChatOrchestrator::authenticate`],
//! then typed frames through [`ChatOrchestrator::handle_frame`].
//!
//! Error policy: an authentication failure aborts the session (the
//! transport closes the connection). Any failure while handling a typed
//! frame is caught here, answered with a `<type>_error` frame, and the
//! session stays open. A session always gets some response to a frame it
//! sent.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use presale_types::assistant::AssistantRole;
use presale_types::chat::{Chat, MessageRecord, NewMessage, Sender};
use presale_types::error::{AuthError, OrchestratorError, ProtocolError, RepositoryError};
use presale_types::frame::{
    typed_error_frame, AuthFrame, ClientFrame, ServerFrame, DEFAULT_PAGE_LIMIT,
};
use presale_types::identity::PartyRole;

use crate::engine::ConversationEngine;
use crate::extractor::extract_deal_fields;
use crate::registry::{ConnectionRegistry, SessionHandle};
use crate::repository::RecordStore;
use crate::run::RunCoordinator;
use crate::verifier::IdentityVerifier;

/// Opening message sent into a fresh chat on behalf of the manager.
pub const WELCOME_TEXT: &str = "Hi! I'm Robert from InfluenceCRM \u{1F60A} Thanks for connecting. \
     Could you tell me how much you charge for a brand integration?";

/// Per-message state machine bridging sessions with the external engine.
pub struct ChatOrchestrator<R, E, V> {
    registry: Arc<ConnectionRegistry>,
    store: Arc<R>,
    verifier: Arc<V>,
    engine: Arc<E>,
    runner: Arc<RunCoordinator<E>>,
    welcome_text: String,
}

impl<R, E, V> ChatOrchestrator<R, E, V>
where
    R: RecordStore,
    E: ConversationEngine,
    V: IdentityVerifier,
{
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<R>,
        verifier: Arc<V>,
        engine: Arc<E>,
        runner: Arc<RunCoordinator<E>>,
    ) -> Self {
        Self { registry, store, verifier, engine, runner, welcome_text: WELCOME_TEXT.to_string() }
    }

    /// Override the welcome text (tests, alternate personas).
    pub fn with_welcome_text(mut self, text: impl Into<String>) -> Self {
        self.welcome_text = text.into();
        self
    }

    /// Process the untyped first frame: verify the token, record the
    /// identity, and for bloggers drive the welcome flow.
    ///
    /// Any error here aborts the session; the transport layer closes the
    /// connection after reporting it.
    pub async fn authenticate(
        &self,
        handle: SessionHandle,
        raw: &str,
    ) -> Result<(), OrchestratorError> {
        let frame: AuthFrame = serde_json::from_str(raw)
            .map_err(|e| AuthError::MalformedHandshake(e.to_string()))?;
        let token = frame.access_token.ok_or(AuthError::MissingToken)?;
        let party = self.verifier.verify(&token).await?;
        self.registry.set_identity(handle, party.party_id, party.role)?;
        tracing::info!(session = %handle, party_id = %party.party_id, role = %party.role, "session authenticated");

        if party.role == PartyRole::Blogger {
            self.welcome_flow(handle, party.party_id).await?;
        }
        Ok(())
    }

    /// Process one typed frame. Failures become error frames; this never
    /// returns an error because the session must stay open.
    pub async fn handle_frame(&self, handle: SessionHandle, raw: &str) {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(session = %handle, error = %e, "unparsable frame");
                let frame = ServerFrame::Error {
                    error: ProtocolError::MalformedFrame(e.to_string()).to_string(),
                };
                self.registry.send(handle, &frame);
                return;
            }
        };
        let frame_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_owned)
            .unwrap_or_default();

        let frame: ClientFrame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(e) => {
                match frame_type.as_str() {
                    // Known type with malformed fields: type-qualified error.
                    "chat_message" | "get_deals" | "get_existing_messages" => {
                        let error = ProtocolError::MalformedFrame(e.to_string());
                        self.registry.send_text(handle, typed_error_frame(&frame_type, &error.to_string()));
                    }
                    _ => {
                        let frame = ServerFrame::Error {
                            error: ProtocolError::UnknownFrameType.to_string(),
                        };
                        self.registry.send(handle, &frame);
                    }
                }
                return;
            }
        };

        let result = match frame {
            ClientFrame::ChatMessage { content } => self.handle_chat_message(handle, &content).await,
            ClientFrame::GetDeals => self.handle_get_deals(handle).await,
            ClientFrame::GetExistingMessages { limit, offset } => {
                self.handle_get_existing_messages(handle, limit, offset).await
            }
        };

        if let Err(error) = result {
            tracing::warn!(session = %handle, frame_type, error = %error, "frame handling failed");
            self.registry.send_text(handle, typed_error_frame(&frame_type, &error.to_string()));
        }
    }

    /// Get-or-create the chat and seed the welcome message into an empty
    /// conversation.
    async fn welcome_flow(
        &self,
        handle: SessionHandle,
        party_id: Uuid,
    ) -> Result<(), OrchestratorError> {
        let chat = self.ensure_chat(&party_id).await?;
        self.registry.set_chat(handle, chat.id)?;

        let page = self.store.page_messages(&chat.id, 1, 0).await?;
        if page.total_count > 0 {
            return Ok(());
        }

        let engine_message_id = self
            .runner
            .post_assistant_message(&chat.manager_thread_id, &self.welcome_text)
            .await?;
        self.store
            .append_message(&NewMessage {
                chat_id: chat.id,
                sender: Sender::Manager,
                content: self.welcome_text.clone(),
                engine_message_id: Some(engine_message_id),
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(chat_id = %chat.id, "welcome message seeded");
        Ok(())
    }

    /// The party's chat, creating it together with its two engine threads
    /// on first contact.
    async fn ensure_chat(&self, party_id: &Uuid) -> Result<Chat, OrchestratorError> {
        if let Some(chat) = self.store.chat_by_party(party_id).await? {
            return Ok(chat);
        }
        let manager_thread_id = self.engine.create_thread().await?;
        let parser_thread_id = self.engine.create_thread().await?;
        let chat = self
            .store
            .create_chat(party_id, &manager_thread_id, &parser_thread_id)
            .await?;
        tracing::info!(chat_id = %chat.id, party_id = %party_id, "chat created");
        Ok(chat)
    }

    /// The three sequential stages of a user message. Each stage must
    /// fully complete before the next starts: the parser and manager runs
    /// have to observe the messages posted before them.
    async fn handle_chat_message(
        &self,
        handle: SessionHandle,
        content: &str,
    ) -> Result<(), OrchestratorError> {
        let chat = self.session_chat(handle).await?;

        // Stage 1: mirror the user message into the manager thread,
        // persist it, and echo it back.
        let engine_message_id = self
            .runner
            .post_user_message(&chat.manager_thread_id, content)
            .await?;
        let user_message = self
            .store
            .append_message(&NewMessage {
                chat_id: chat.id,
                sender: Sender::User,
                content: content.to_string(),
                engine_message_id: Some(engine_message_id),
                created_at: Utc::now(),
            })
            .await?;
        self.send_chat_message(handle, &user_message);

        // Stage 2: parser pass over its own thread, then merge any
        // extracted fields into the deal.
        self.parse_and_update_deal(&chat, content).await?;

        // Stage 3: manager reply, persisted and echoed back.
        let reply = self
            .runner
            .run_assistant(&chat.manager_thread_id, AssistantRole::Manager)
            .await?;
        let manager_message = self
            .store
            .append_message(&NewMessage {
                chat_id: chat.id,
                sender: Sender::Manager,
                content: reply.first_text().to_string(),
                engine_message_id: reply.message_id.clone(),
                created_at: Utc::now(),
            })
            .await?;
        self.send_chat_message(handle, &manager_message);
        Ok(())
    }

    /// Run the parser over the user's text and merge-upsert any extracted
    /// fields, broadcasting the update to marketer sessions. An
    /// extraction miss silently skips the update.
    async fn parse_and_update_deal(
        &self,
        chat: &Chat,
        content: &str,
    ) -> Result<(), OrchestratorError> {
        self.runner
            .post_user_message(&chat.parser_thread_id, content)
            .await?;
        let reply = self
            .runner
            .run_assistant(&chat.parser_thread_id, AssistantRole::Parser)
            .await?;

        let Some(patch) = extract_deal_fields(&reply.content) else {
            tracing::debug!(chat_id = %chat.id, "parser reply carried no deal fields");
            return Ok(());
        };
        self.store.upsert_deal(&chat.id, &patch).await?;
        let delivered = self.registry.broadcast(
            PartyRole::Marketer,
            &ServerFrame::DealUpdate { chat_id: chat.id, deal_update: patch },
        );
        tracing::debug!(chat_id = %chat.id, delivered, "deal update broadcast");
        Ok(())
    }

    async fn handle_get_deals(&self, handle: SessionHandle) -> Result<(), OrchestratorError> {
        let deals = self.store.list_deals().await?;
        self.registry.send(handle, &ServerFrame::DealsList { deals });
        Ok(())
    }

    async fn handle_get_existing_messages(
        &self,
        handle: SessionHandle,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(), OrchestratorError> {
        let chat = self.session_chat(handle).await?;
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(0);
        let offset = offset.unwrap_or(0).max(0);

        let page = self.store.page_messages(&chat.id, limit, offset).await?;
        self.registry.send(
            handle,
            &ServerFrame::MessagesPage {
                messages: page.messages,
                total_count: page.total_count,
                limit,
                offset,
                chat_id: chat.id,
            },
        );
        Ok(())
    }

    /// The chat owned by the session's authenticated party.
    ///
    /// Served from the chat id bound to the session during the welcome
    /// flow; sessions without a binding (marketers, or a binding that
    /// points at a deleted row) fall back to the party lookup and cache
    /// the result for later frames.
    async fn session_chat(&self, handle: SessionHandle) -> Result<Chat, OrchestratorError> {
        if let Some(chat_id) = self.registry.chat_id(handle) {
            if let Some(chat) = self.store.chat_by_id(&chat_id).await? {
                return Ok(chat);
            }
        }

        let (party_id, _) = self
            .registry
            .identity(handle)
            .ok_or(ProtocolError::Unauthenticated)?;
        let chat = self
            .store
            .chat_by_party(&party_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.registry.set_chat(handle, chat.id)?;
        Ok(chat)
    }

    fn send_chat_message(&self, handle: SessionHandle, message: &MessageRecord) {
        self.registry.send(
            handle,
            &ServerFrame::ChatMessage {
                chat_id: message.chat_id,
                sender: message.sender,
                content: message.content.clone(),
                created_at: message.created_at,
                engine_message_id: message.engine_message_id.clone(),
            },
        );
    }
}
