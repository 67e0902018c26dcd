//! Message entity definitions

use serde::{Deserialize, Serialize};

/// An immutable message record. Owned by whichever destination references
/// it; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub public_id: String,
    pub text: String,
    pub sender_id: i64,
    pub attachments: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub text: String,
    pub sender_id: i64,
    pub attachments: Vec<String>,
}

/// A message as returned by history reads, enriched with sender identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub attachments: Vec<String>,
    pub created_at: String,
    pub sender: SenderView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
}
