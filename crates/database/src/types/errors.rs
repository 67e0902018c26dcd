//! Error types for the messaging domain

use thiserror::Error;

/// Messaging domain error
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Only one of topic or user may be given")]
    AmbiguousDestination,

    #[error("Topic or user is required")]
    MissingDestination,

    #[error("Too many attachments: {given} given, limit is {limit}")]
    TooManyAttachments { given: usize, limit: usize },

    #[error("Conversation creation conflict did not converge")]
    ConflictRetryExhausted,

    #[error("Conversation already exists for this pair")]
    ConversationExists,

    #[error("Topic not found")]
    TopicNotFound,

    #[error("Topic with name {0} already exists")]
    TopicExists(String),

    #[error("Topic still has messages and cannot be deleted")]
    TopicNotEmpty,

    #[error("User not found")]
    UserNotFound,

    #[error("User with this username or email already exists")]
    UserExists,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
