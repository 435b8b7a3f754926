//! Support conversation repository.

use sqlx::PgPool;

use tuntas_kilat_core::{ConversationId, OrderId, UserId, UserRole};

use super::RepositoryError;
use crate::models::{Conversation, ConversationMessage};

const CONVERSATION_COLUMNS: &str = "id, customer_id, order_id, subject, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, sender_role, body, created_at";

/// Repository for conversations and their messages.
pub struct ConversationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationRepository<'a> {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a conversation for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        customer_id: UserId,
        order_id: Option<OrderId>,
        subject: &str,
    ) -> Result<Conversation, RepositoryError> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "INSERT INTO conversations (customer_id, order_id, subject) VALUES ($1, $2, $3) \
             RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(customer_id)
        .bind(order_id)
        .bind(subject)
        .fetch_one(self.pool)
        .await?;
        Ok(conversation)
    }

    /// Get a conversation by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(conversation)
    }

    /// Conversations ordered by latest activity; `None` lists every customer's.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        customer_id: Option<UserId>,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE ($1::int4 IS NULL OR customer_id = $1) \
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(conversations)
    }

    /// Messages in a conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn messages(
        &self,
        id: ConversationId,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let messages = sqlx::query_as::<_, ConversationMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM conversation_messages \
             WHERE conversation_id = $1 ORDER BY created_at, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(messages)
    }

    /// Append a message and bump the conversation's activity time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation does not exist.
    pub async fn add_message(
        &self,
        id: ConversationId,
        sender_id: UserId,
        sender_role: UserRole,
        body: &str,
    ) -> Result<ConversationMessage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let message = sqlx::query_as::<_, ConversationMessage>(&format!(
            "INSERT INTO conversation_messages (conversation_id, sender_id, sender_role, body) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(sender_id)
        .bind(sender_role)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }
}
