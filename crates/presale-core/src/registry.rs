//! Live session registry.
//!
//! The one structure shared across all sessions. Keyed by a stable
//! [`SessionHandle`] rather than identity equality, backed by a
//! [`DashMap`] so connect/disconnect/identity-set from arbitrary session
//! workers never race an iteration.
//!
//! Sessions never persist: created on connect, identity set once after
//! authentication, removed on disconnect.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use presale_types::error::ProtocolError;
use presale_types::frame::ServerFrame;
use presale_types::identity::PartyRole;

/// Stable, copyable identifier for one live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(Uuid);

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound channel for one session. The transport layer drains the
/// receiving half into the socket.
pub type FrameSender = mpsc::UnboundedSender<String>;

struct SessionEntry {
    tx: FrameSender,
    party_id: Option<Uuid>,
    role: Option<PartyRole>,
    chat_id: Option<Uuid>,
}

/// Registry of live sessions with role-scoped broadcast.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<SessionHandle, SessionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session. Identity, role, and chat start unset.
    pub fn register(&self, tx: FrameSender) -> SessionHandle {
        let handle = SessionHandle(Uuid::new_v4());
        self.sessions
            .insert(handle, SessionEntry { tx, party_id: None, role: None, chat_id: None });
        tracing::debug!(session = %handle, "session registered");
        handle
    }

    /// Remove a session. Idempotent; a no-op if already removed.
    pub fn deregister(&self, handle: SessionHandle) {
        if self.sessions.remove(&handle).is_some() {
            tracing::debug!(session = %handle, "session deregistered");
        }
    }

    /// One-time identity mutation after successful authentication.
    ///
    /// Setting the same identity again is a no-op; a conflicting value is
    /// a [`ProtocolError::IdentityConflict`], never a silent overwrite.
    pub fn set_identity(
        &self,
        handle: SessionHandle,
        party_id: Uuid,
        role: PartyRole,
    ) -> Result<(), ProtocolError> {
        let mut entry = self.sessions.get_mut(&handle).ok_or(ProtocolError::UnknownSession)?;
        match (entry.party_id, entry.role) {
            (None, _) => {
                entry.party_id = Some(party_id);
                entry.role = Some(role);
                Ok(())
            }
            (Some(existing_id), existing_role)
                if existing_id == party_id && existing_role == Some(role) =>
            {
                Ok(())
            }
            _ => Err(ProtocolError::IdentityConflict),
        }
    }

    /// Associate a chat with a session.
    pub fn set_chat(&self, handle: SessionHandle, chat_id: Uuid) -> Result<(), ProtocolError> {
        let mut entry = self.sessions.get_mut(&handle).ok_or(ProtocolError::UnknownSession)?;
        entry.chat_id = Some(chat_id);
        Ok(())
    }

    /// Authenticated party of a session, if set.
    pub fn identity(&self, handle: SessionHandle) -> Option<(Uuid, PartyRole)> {
        let entry = self.sessions.get(&handle)?;
        Some((entry.party_id?, entry.role?))
    }

    /// Chat bound to a session, if set.
    pub fn chat_id(&self, handle: SessionHandle) -> Option<Uuid> {
        self.sessions.get(&handle)?.chat_id
    }

    /// Send a frame to one session. Best-effort: returns false when the
    /// session is gone or its channel is closed.
    pub fn send(&self, handle: SessionHandle, frame: &ServerFrame) -> bool {
        self.send_text(handle, frame.to_text())
    }

    /// Send pre-serialized frame text to one session.
    pub fn send_text(&self, handle: SessionHandle, text: String) -> bool {
        match self.sessions.get(&handle) {
            Some(entry) => entry.tx.send(text).is_ok(),
            None => false,
        }
    }

    /// Send a frame to every session with the given role.
    ///
    /// Best-effort: a failed send to one session neither prevents delivery
    /// to others nor removes that session (disconnect is detected and
    /// handled by the transport loop).
    pub fn broadcast(&self, role: PartyRole, frame: &ServerFrame) -> usize {
        let text = frame.to_text();
        let mut delivered = 0;
        for entry in self.sessions.iter() {
            if entry.role == Some(role) {
                if entry.tx.send(text.clone()).is_ok() {
                    delivered += 1;
                } else {
                    tracing::warn!(session = %entry.key(), "broadcast send failed; session kept");
                }
            }
        }
        delivered
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
