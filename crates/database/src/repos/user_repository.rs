//! Repository for the actor directory.

use crate::entities::{CreateUserRequest, User, UserLookup};
use crate::types::{MessagingError, MessagingResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for user database operations
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user and issue its api token.
    pub async fn create(&self, request: &CreateUserRequest) -> MessagingResult<(User, String)> {
        let public_id = cuid2::cuid();
        let api_token = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (public_id, name, username, email, api_token, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&api_token)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => MessagingError::UserExists,
            _ => MessagingError::DatabaseError(e.to_string()),
        })?;

        let user_id = result.last_insert_rowid();

        info!(
            user_id = user_id,
            public_id = %public_id,
            username = %request.username,
            "created new user"
        );

        Ok((
            User {
                id: user_id,
                public_id,
                name: request.name.clone(),
                username: request.username.clone(),
                email: request.email.clone(),
                created_at: now,
            },
            api_token,
        ))
    }

    /// Find a user by lookup key.
    pub async fn find(&self, key: &UserLookup) -> MessagingResult<Option<User>> {
        let query = match key {
            UserLookup::PublicId(value) => sqlx::query(
                "SELECT id, public_id, name, username, email, created_at
                 FROM users WHERE public_id = ?",
            )
            .bind(value),
            UserLookup::Username(value) => sqlx::query(
                "SELECT id, public_id, name, username, email, created_at
                 FROM users WHERE username = ?",
            )
            .bind(value),
            UserLookup::UsernameOrEmail(value) => sqlx::query(
                "SELECT id, public_id, name, username, email, created_at
                 FROM users WHERE username = ? OR email = ?",
            )
            .bind(value)
            .bind(value),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_user(&row)).transpose()
    }

    /// Find a user by internal id.
    pub async fn find_by_id(&self, id: i64) -> MessagingResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, username, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_user(&row)).transpose()
    }

    /// Find the user owning an api token.
    pub async fn find_by_token(&self, token: &str) -> MessagingResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, username, email, created_at
             FROM users WHERE api_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        row.map(|row| map_user(&row)).transpose()
    }

    /// List all users.
    pub async fn list(&self) -> MessagingResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, public_id, name, username, email, created_at
             FROM users ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.iter().map(map_user).collect()
    }
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> MessagingResult<User> {
    Ok(User {
        id: row
            .try_get("id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        username: row
            .try_get("username")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        email: row
            .try_get("email")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?,
    })
}
