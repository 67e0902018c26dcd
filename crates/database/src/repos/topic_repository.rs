//! Repository for topic data access operations.

use crate::entities::{CreateTopicRequest, Topic};
use crate::types::{MessagingError, MessagingResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

const TOPIC_COLUMNS: &str = "t.id, t.public_id, t.name, t.description, t.created_at, t.updated_at,
        (SELECT COUNT(*) FROM topic_members WHERE topic_id = t.id) as member_count,
        (SELECT COUNT(*) FROM topic_messages WHERE topic_id = t.id) as message_count";

/// Repository for topic database operations
pub struct TopicRepository {
    pool: SqlitePool,
}

impl TopicRepository {
    /// Create a new topic repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a topic by its globally unique name.
    pub async fn find_by_name(&self, name: &str) -> MessagingResult<Option<Topic>> {
        let query = format!("SELECT {TOPIC_COLUMNS} FROM topics t WHERE t.name = ?");
        let row = sqlx::query(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_topic(&row)).transpose()
    }

    /// Find a topic by its public ID.
    pub async fn find_by_public_id(&self, public_id: &str) -> MessagingResult<Option<Topic>> {
        let query = format!("SELECT {TOPIC_COLUMNS} FROM topics t WHERE t.public_id = ?");
        let row = sqlx::query(&query)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_topic(&row)).transpose()
    }

    /// List all topics.
    pub async fn list(&self) -> MessagingResult<Vec<Topic>> {
        let query = format!("SELECT {TOPIC_COLUMNS} FROM topics t ORDER BY t.name ASC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.iter().map(map_topic).collect()
    }

    /// Create a new topic with its initial members.
    ///
    /// `member_ids` are internal user ids already validated by the caller.
    pub async fn create(
        &self,
        request: &CreateTopicRequest,
        member_ids: &[i64],
    ) -> MessagingResult<Topic> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO topics (public_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                MessagingError::TopicExists(request.name.clone())
            }
            _ => MessagingError::DatabaseError(e.to_string()),
        })?;

        let topic_id = result.last_insert_rowid();

        for user_id in member_ids {
            sqlx::query("INSERT OR IGNORE INTO topic_members (topic_id, user_id) VALUES (?, ?)")
                .bind(topic_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        info!(
            topic_id = topic_id,
            public_id = %public_id,
            name = %request.name,
            members = member_ids.len(),
            "created new topic"
        );

        Ok(Topic {
            id: topic_id,
            public_id,
            name: request.name.clone(),
            description: request.description.clone(),
            created_at: now.clone(),
            updated_at: now,
            member_count: member_ids.len() as i64,
            message_count: 0,
        })
    }

    /// Append a message reference to the topic's ordered message list.
    ///
    /// Append order is the insertion order of the link rows; existing rows
    /// are never reordered or removed.
    pub async fn append_message(&self, topic_id: i64, message_id: i64) -> MessagingResult<()> {
        sqlx::query("INSERT INTO topic_messages (topic_id, message_id) VALUES (?, ?)")
            .bind(topic_id)
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query("UPDATE topics SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Delete a topic. Refused while the topic's message list is non-empty.
    pub async fn delete(&self, public_id: &str) -> MessagingResult<()> {
        let topic = self
            .find_by_public_id(public_id)
            .await?
            .ok_or(MessagingError::TopicNotFound)?;

        if topic.message_count > 0 {
            return Err(MessagingError::TopicNotEmpty);
        }

        sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(topic.id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        info!(public_id = public_id, "deleted topic");
        Ok(())
    }
}

fn map_topic(row: &sqlx::sqlite::SqliteRow) -> MessagingResult<Topic> {
    Ok(Topic {
        id: row
            .try_get("id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        member_count: row
            .try_get("member_count")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        message_count: row
            .try_get("message_count")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
    })
}
