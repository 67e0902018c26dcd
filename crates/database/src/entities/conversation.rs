//! Conversation entity definitions

use serde::{Deserialize, Serialize};

/// A direct exchange between exactly two users.
///
/// The participant pair is unordered; rows store it canonically with
/// `user_lo < user_hi` so the database enforces at most one conversation
/// per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub public_id: String,
    pub user_lo: i64,
    pub user_hi: i64,
    pub created_at: String,
}

impl Conversation {
    pub fn involves(&self, user_id: i64) -> bool {
        self.user_lo == user_id || self.user_hi == user_id
    }

    /// Canonical ordering of an unordered participant pair.
    pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
