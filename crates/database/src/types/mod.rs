//! Shared types for the database layer

pub mod errors;

pub use errors::MessagingError;

/// Result alias used throughout the messaging domain
pub type MessagingResult<T> = Result<T, MessagingError>;
