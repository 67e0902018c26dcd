//! Repository for conversation data access operations.

use crate::entities::Conversation;
use crate::types::{MessagingError, MessagingResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for conversation database operations
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the conversation for an unordered participant pair.
    pub async fn find_by_pair(&self, a: i64, b: i64) -> MessagingResult<Option<Conversation>> {
        let (lo, hi) = Conversation::canonical_pair(a, b);

        let row = sqlx::query(
            "SELECT id, public_id, user_lo, user_hi, created_at
             FROM conversations WHERE user_lo = ? AND user_hi = ?",
        )
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_conversation(&row)).transpose()
    }

    /// Create the conversation for an unordered participant pair.
    ///
    /// The UNIQUE constraint on the canonical pair makes a lost
    /// lookup-then-create race surface as `ConversationExists`; the resolver
    /// re-reads on that error instead of surfacing a duplicate.
    pub async fn create(&self, a: i64, b: i64) -> MessagingResult<Conversation> {
        if a == b {
            return Err(MessagingError::Validation(
                "conversation participants must be distinct".to_string(),
            ));
        }

        let (lo, hi) = Conversation::canonical_pair(a, b);
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO conversations (public_id, user_lo, user_hi, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(lo)
        .bind(hi)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                MessagingError::ConversationExists
            }
            _ => MessagingError::DatabaseError(e.to_string()),
        })?;

        let conversation_id = result.last_insert_rowid();

        info!(
            conversation_id = conversation_id,
            public_id = %public_id,
            user_lo = lo,
            user_hi = hi,
            "created new conversation"
        );

        Ok(Conversation {
            id: conversation_id,
            public_id,
            user_lo: lo,
            user_hi: hi,
            created_at: now,
        })
    }

    /// Append a message reference to the conversation's ordered message list.
    pub async fn append_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> MessagingResult<()> {
        sqlx::query("INSERT INTO conversation_messages (conversation_id, message_id) VALUES (?, ?)")
            .bind(conversation_id)
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(())
    }

}

fn map_conversation(row: &sqlx::sqlite::SqliteRow) -> MessagingResult<Conversation> {
    Ok(Conversation {
        id: row
            .try_get("id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        user_lo: row
            .try_get("user_lo")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        user_hi: row
            .try_get("user_hi")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CreateUserRequest;
    use crate::migrations::run_migrations;
    use crate::repos::UserRepository;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_conversations.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        (pool, temp_dir)
    }

    async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
        let repo = UserRepository::new(pool.clone());
        let (user, _) = repo
            .create(&CreateUserRequest {
                name: username.to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
            })
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_pair_lookup_is_order_insensitive() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool);

        let created = repo.create(bob, alice).await.unwrap();
        assert_eq!(
            (created.user_lo, created.user_hi),
            Conversation::canonical_pair(alice, bob)
        );

        let forward = repo.find_by_pair(alice, bob).await.unwrap().unwrap();
        let reverse = repo.find_by_pair(bob, alice).await.unwrap().unwrap();
        assert_eq!(forward.id, created.id);
        assert_eq!(reverse.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool);

        repo.create(alice, bob).await.unwrap();
        let err = repo.create(bob, alice).await.unwrap_err();
        assert!(matches!(err, MessagingError::ConversationExists));
    }

    #[tokio::test]
    async fn test_self_conversation_rejected() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let repo = ConversationRepository::new(pool);

        let err = repo.create(alice, alice).await.unwrap_err();
        assert!(matches!(err, MessagingError::Validation(_)));
    }
}
