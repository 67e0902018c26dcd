//! Entity definitions for the messaging domain

pub mod conversation;
pub mod message;
pub mod topic;
pub mod user;

pub use conversation::Conversation;
pub use message::{CreateMessageRequest, Message, MessageView, SenderView};
pub use topic::{CreateTopicRequest, Topic};
pub use user::{CreateUserRequest, User, UserLookup};
