//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `aichat-core`. The transcript is
//! stored as one JSON array per row; a stream close rewrites it whole.

use aichat_core::chat::repository::ConversationRepository;
use aichat_types::chat::{Conversation, Message};
use aichat_types::error::RepositoryError;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Conversation.
struct ConversationRow {
    id: String,
    owner_id: String,
    model: i64,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            model: row.try_get("model")?,
            messages: row.try_get("messages")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))?;
        let model = u8::try_from(self.model)
            .map_err(|e| RepositoryError::Query(format!("invalid model selector: {e}")))?;
        let messages: Vec<Message> = serde_json::from_str(&self.messages)
            .map_err(|e| RepositoryError::Query(format!("invalid messages json: {e}")))?;

        Ok(Conversation {
            id,
            owner_id: self.owner_id,
            model,
            messages,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn encode_messages(messages: &[Message]) -> Result<String, RepositoryError> {
    serde_json::to_string(messages)
        .map_err(|e| RepositoryError::Query(format!("failed to encode messages: {e}")))
}

impl ConversationRepository for SqliteConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError> {
        let messages = encode_messages(&conversation.messages)?;

        sqlx::query(
            "INSERT INTO conversations (id, owner_id, model, messages, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(&conversation.owner_id)
        .bind(i64::from(conversation.model))
        .bind(&messages)
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(conversation.clone())
    }

    async fn find(
        &self,
        id: &Uuid,
        owner_id: &str,
        model: u8,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, owner_id, model, messages, created_at, updated_at
             FROM conversations WHERE id = ? AND owner_id = ? AND model = ?",
        )
        .bind(id.to_string())
        .bind(owner_id)
        .bind(i64::from(model))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let conversation_row = ConversationRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(conversation_row.into_conversation()?))
            }
            None => Ok(None),
        }
    }

    async fn save_messages(&self, id: &Uuid, messages: &[Message]) -> Result<(), RepositoryError> {
        let encoded = encode_messages(messages)?;

        let result = sqlx::query("UPDATE conversations SET messages = ?, updated_at = ? WHERE id = ?")
            .bind(&encoded)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
