//! Courier Database Crate
//!
//! Connection management, migrations, entities, and repository
//! implementations for the Courier messaging backend.

use sqlx::SqlitePool;

use courier_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{ConversationRepository, MessageRepository, TopicRepository, UserRepository};

// Re-export entities
pub use entities::{
    conversation::Conversation,
    message::{CreateMessageRequest, Message, MessageView, SenderView},
    topic::{CreateTopicRequest, Topic},
    user::{CreateUserRequest, User, UserLookup},
};

// Re-export types
pub use types::{errors::MessagingError, MessagingResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let pool = prepare_database(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
