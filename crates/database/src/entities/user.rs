//! User entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Lookup key kinds accepted by the actor directory.
///
/// The endpoints address users by opaque public id in some places and by
/// unique username in others; a single parameterized lookup covers both.
#[derive(Debug, Clone)]
pub enum UserLookup {
    PublicId(String),
    Username(String),
    /// The send path accepts either a username or an email address.
    UsernameOrEmail(String),
}
