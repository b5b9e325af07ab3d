//! SQLite record store.
//!
//! Implements `RecordStore` from presale-core using sqlx with the split
//! read/write pool: raw queries, private Row structs, `try_get` mapping.
//!
//! Two uniqueness constraints close check-then-act races at the storage
//! boundary: `chats.blogger_id` makes chat creation idempotent per party
//! (`INSERT OR IGNORE` + re-select), and `deals.chat_id` lets the deal
//! upsert run as a single `ON CONFLICT DO UPDATE` whose COALESCE merge
//! never regresses a known field to NULL.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use presale_core::repository::RecordStore;
use presale_types::chat::{Chat, Deal, DealPatch, MessageRecord, MessagesPage, NewMessage, Sender};
use presale_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `RecordStore`.
pub struct SqliteRecordStore {
    pool: DatabasePool,
}

impl SqliteRecordStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    id: String,
    blogger_id: String,
    manager_thread_id: String,
    parser_thread_id: String,
    created_at: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            blogger_id: row.try_get("blogger_id")?,
            manager_thread_id: row.try_get("manager_thread_id")?,
            parser_thread_id: row.try_get("parser_thread_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        Ok(Chat {
            id: parse_uuid(&self.id, "chat id")?,
            blogger_id: parse_uuid(&self.blogger_id, "blogger_id")?,
            manager_thread_id: self.manager_thread_id,
            parser_thread_id: self.parser_thread_id,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    chat_id: String,
    sender: String,
    content: String,
    engine_message_id: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            engine_message_id: row.try_get("engine_message_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<MessageRecord, RepositoryError> {
        let sender: Sender = self.sender.parse().map_err(RepositoryError::Query)?;
        Ok(MessageRecord {
            id: parse_uuid(&self.id, "message id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            sender,
            content: self.content,
            engine_message_id: self.engine_message_id,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct DealRow {
    id: String,
    chat_id: String,
    price_usd: Option<f64>,
    availability: Option<String>,
    discounts: Option<String>,
    status: Option<String>,
    updated_at: String,
}

impl DealRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            price_usd: row.try_get("price_usd")?,
            availability: row.try_get("availability")?,
            discounts: row.try_get("discounts")?,
            status: row.try_get("status")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_deal(self) -> Result<Deal, RepositoryError> {
        Ok(Deal {
            id: parse_uuid(&self.id, "deal id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            price_usd: self.price_usd,
            availability: self.availability,
            discounts: self.discounts,
            status: self.status,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

impl RecordStore for SqliteRecordStore {
    async fn chat_by_party(&self, party_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, blogger_id, manager_thread_id, parser_thread_id, created_at
             FROM chats WHERE blogger_id = ?",
        )
        .bind(party_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|r| ChatRow::from_row(&r).map_err(query_error)?.into_chat())
            .transpose()
    }

    async fn chat_by_id(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, blogger_id, manager_thread_id, parser_thread_id, created_at
             FROM chats WHERE id = ?",
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|r| ChatRow::from_row(&r).map_err(query_error)?.into_chat())
            .transpose()
    }

    async fn create_chat(
        &self,
        party_id: &Uuid,
        manager_thread_id: &str,
        parser_thread_id: &str,
    ) -> Result<Chat, RepositoryError> {
        // A concurrent duplicate insert loses to the UNIQUE(blogger_id)
        // constraint and the re-select returns the winner's row.
        sqlx::query(
            "INSERT OR IGNORE INTO chats
                 (id, blogger_id, manager_thread_id, parser_thread_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(party_id.to_string())
        .bind(manager_thread_id)
        .bind(parser_thread_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        let row = sqlx::query(
            "SELECT id, blogger_id, manager_thread_id, parser_thread_id, created_at
             FROM chats WHERE blogger_id = ?",
        )
        .bind(party_id.to_string())
        .fetch_one(&self.pool.writer)
        .await
        .map_err(query_error)?;

        ChatRow::from_row(&row).map_err(query_error)?.into_chat()
    }

    async fn append_message(&self, message: &NewMessage) -> Result<MessageRecord, RepositoryError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender, content, engine_message_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.sender.to_string())
        .bind(&message.content)
        .bind(message.engine_message_id.as_deref())
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(MessageRecord {
            id,
            chat_id: message.chat_id,
            sender: message.sender,
            content: message.content.clone(),
            engine_message_id: message.engine_message_id.clone(),
            created_at: message.created_at,
        })
    }

    async fn page_messages(
        &self,
        chat_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<MessagesPage, RepositoryError> {
        let total_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let rows = sqlx::query(
            "SELECT id, chat_id, sender, content, engine_message_id, created_at
             FROM messages WHERE chat_id = ?
             ORDER BY created_at ASC LIMIT ? OFFSET ?",
        )
        .bind(chat_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let messages = rows
            .iter()
            .map(|r| MessageRow::from_row(r).map_err(query_error)?.into_record())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MessagesPage { messages, total_count: total_count.0 })
    }

    async fn upsert_deal(
        &self,
        chat_id: &Uuid,
        patch: &DealPatch,
    ) -> Result<Deal, RepositoryError> {
        // COALESCE keeps the stored value wherever the patch field is
        // absent, so a known field never regresses to NULL.
        sqlx::query(
            "INSERT INTO deals (id, chat_id, price_usd, availability, discounts, status, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET
                 price_usd = COALESCE(excluded.price_usd, deals.price_usd),
                 availability = COALESCE(excluded.availability, deals.availability),
                 discounts = COALESCE(excluded.discounts, deals.discounts),
                 status = COALESCE(excluded.status, deals.status),
                 updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(chat_id.to_string())
        .bind(patch.price_usd)
        .bind(patch.availability.as_deref())
        .bind(patch.discounts.as_deref())
        .bind(patch.status.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        let row = sqlx::query(
            "SELECT id, chat_id, price_usd, availability, discounts, status, updated_at
             FROM deals WHERE chat_id = ?",
        )
        .bind(chat_id.to_string())
        .fetch_one(&self.pool.writer)
        .await
        .map_err(query_error)?;

        DealRow::from_row(&row).map_err(query_error)?.into_deal()
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, chat_id, price_usd, availability, discounts, status, updated_at
             FROM deals ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|r| DealRow::from_row(r).map_err(query_error)?.into_deal())
            .collect()
    }
}
