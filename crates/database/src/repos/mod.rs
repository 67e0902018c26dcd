//! Repository implementations for data access

pub mod conversation_repository;
pub mod message_repository;
pub mod topic_repository;
pub mod user_repository;

pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;
pub use topic_repository::TopicRepository;
pub use user_repository::UserRepository;
