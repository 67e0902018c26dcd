//! Repository for message data access operations.

use crate::entities::{CreateMessageRequest, Message, MessageView, SenderView};
use crate::types::{MessagingError, MessagingResult};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an immutable message record.
    ///
    /// The record is always created before any destination linkage.
    pub async fn create(&self, request: &CreateMessageRequest) -> MessagingResult<Message> {
        if request.text.trim().is_empty() {
            return Err(MessagingError::Validation(
                "message text must not be empty".to_string(),
            ));
        }

        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();
        let attachments_json = serde_json::to_string(&request.attachments)
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO messages (public_id, text, sender_id, attachments, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.text)
        .bind(request.sender_id)
        .bind(&attachments_json)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id = message_id,
            public_id = %public_id,
            sender_id = request.sender_id,
            attachments = request.attachments.len(),
            "created new message"
        );

        Ok(Message {
            id: message_id,
            public_id,
            text: request.text.clone(),
            sender_id: request.sender_id,
            attachments: request.attachments.clone(),
            created_at: now,
        })
    }

    /// Find a message by internal id.
    pub async fn find_by_id(&self, id: i64) -> MessagingResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, public_id, text, sender_id, attachments, created_at
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_message(&row)).transpose()
    }

    /// Delete a message record.
    ///
    /// Only used to compensate for a failed destination append; a linked
    /// message is never deleted.
    pub async fn delete(&self, id: i64) -> MessagingResult<()> {
        sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        warn!(message_id = id, "deleted orphaned message");
        Ok(())
    }

    /// Messages referenced by a topic, in the topic's stored append order.
    ///
    /// The link-table insertion order is authoritative; results are never
    /// re-sorted by creation time.
    pub async fn list_for_topic(&self, topic_id: i64, limit: i64) -> MessagingResult<Vec<MessageView>> {
        let rows = sqlx::query(
            "SELECT m.public_id, m.text, m.attachments, m.created_at,
                    u.public_id as sender_public_id, u.name as sender_name,
                    u.username as sender_username, u.email as sender_email
             FROM topic_messages tm
             JOIN messages m ON tm.message_id = m.id
             JOIN users u ON m.sender_id = u.id
             WHERE tm.topic_id = ?
             ORDER BY tm.id ASC LIMIT ?",
        )
        .bind(topic_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.iter().map(map_message_view).collect()
    }

    /// Messages exchanged between two users, newest first.
    ///
    /// Matches the send-path convention for direct exchanges: any message
    /// whose sender is either participant, ordered by creation time
    /// descending for most-recent-first rendering.
    pub async fn list_for_direct(
        &self,
        self_id: i64,
        peer_id: i64,
        limit: i64,
    ) -> MessagingResult<Vec<MessageView>> {
        let rows = sqlx::query(
            "SELECT m.public_id, m.text, m.attachments, m.created_at,
                    u.public_id as sender_public_id, u.name as sender_name,
                    u.username as sender_username, u.email as sender_email
             FROM messages m
             JOIN users u ON m.sender_id = u.id
             WHERE m.sender_id IN (?, ?)
             ORDER BY m.created_at DESC, m.id DESC LIMIT ?",
        )
        .bind(self_id)
        .bind(peer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.iter().map(map_message_view).collect()
    }
}

fn parse_attachments(json: &str) -> MessagingResult<Vec<String>> {
    serde_json::from_str(json).map_err(|e| MessagingError::DatabaseError(e.to_string()))
}

fn map_message(row: &sqlx::sqlite::SqliteRow) -> MessagingResult<Message> {
    let attachments_json: String = row
        .try_get("attachments")
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

    Ok(Message {
        id: row
            .try_get("id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        text: row
            .try_get("text")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        sender_id: row
            .try_get("sender_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        attachments: parse_attachments(&attachments_json)?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
    })
}

fn map_message_view(row: &sqlx::sqlite::SqliteRow) -> MessagingResult<MessageView> {
    let attachments_json: String = row
        .try_get("attachments")
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

    Ok(MessageView {
        id: row
            .try_get("public_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        text: row
            .try_get("text")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        attachments: parse_attachments(&attachments_json)?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        sender: SenderView {
            id: row
                .try_get("sender_public_id")
                .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
            name: row
                .try_get("sender_name")
                .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
            username: row
                .try_get("sender_username")
                .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
            email: row
                .try_get("sender_email")
                .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        },
    })
}
