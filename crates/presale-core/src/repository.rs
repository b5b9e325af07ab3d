//! RecordStore trait definition.
//!
//! Durable persistence for chats, messages, and deals. The orchestration
//! core keeps no persistent copies of these; it reads and writes through
//! this contract only. The SQLite implementation lives in presale-infra.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use presale_types::chat::{Chat, Deal, DealPatch, MessageRecord, MessagesPage, NewMessage};
use presale_types::error::RepositoryError;
use uuid::Uuid;

/// Repository contract for the durable negotiation records.
pub trait RecordStore: Send + Sync {
    /// Look up the chat owned by a party, if any.
    fn chat_by_party(
        &self,
        party_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Look up a chat by its id, if any.
    fn chat_by_id(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Create the chat for a party with its two engine thread ids.
    ///
    /// A party owns at most one chat; a concurrent duplicate insert must
    /// resolve to the already-existing row rather than a second one.
    fn create_chat(
        &self,
        party_id: &Uuid,
        manager_thread_id: &str,
        parser_thread_id: &str,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Append a message to a chat's history.
    fn append_message(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<MessageRecord, RepositoryError>> + Send;

    /// One page of a chat's messages, ascending by creation time, with the
    /// chat's total message count.
    fn page_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<MessagesPage, RepositoryError>> + Send;

    /// Merge the supplied fields into the chat's deal, inserting it on
    /// first contact. Absent fields never overwrite known values.
    fn upsert_deal(
        &self,
        chat_id: &Uuid,
        patch: &DealPatch,
    ) -> impl std::future::Future<Output = Result<Deal, RepositoryError>> + Send;

    /// All deals across all chats.
    fn list_deals(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Deal>, RepositoryError>> + Send;
}
