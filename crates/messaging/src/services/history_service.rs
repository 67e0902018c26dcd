//! History reads: bounded, ordered message slices with sender identity.

use courier_database::{
    MessageRepository, MessageView, MessagingError, MessagingResult, TopicRepository, UserLookup,
    UserRepository,
};
use sqlx::SqlitePool;

/// Reads destination message history for topic and direct views.
///
/// The two views deliberately use opposite orderings: a topic returns its
/// stored append order (oldest reference first), a direct view returns
/// newest first for chat rendering. Reads bypass the delivery coordinator.
pub struct HistoryService {
    topic_repository: TopicRepository,
    user_repository: UserRepository,
    message_repository: MessageRepository,
    default_limit: i64,
}

impl HistoryService {
    /// Create a new history service instance
    pub fn new(pool: SqlitePool, default_limit: i64) -> Self {
        Self {
            topic_repository: TopicRepository::new(pool.clone()),
            user_repository: UserRepository::new(pool.clone()),
            message_repository: MessageRepository::new(pool),
            default_limit,
        }
    }

    /// Up to `limit` messages of a topic, in stored append order.
    pub async fn topic_history(
        &self,
        name: &str,
        limit: Option<i64>,
    ) -> MessagingResult<Vec<MessageView>> {
        let topic = self
            .topic_repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| MessagingError::DestinationNotFound(format!("topic {name}")))?;

        self.message_repository
            .list_for_topic(topic.id, self.effective_limit(limit))
            .await
    }

    /// Up to `limit` messages exchanged with a peer, newest first.
    pub async fn direct_history(
        &self,
        self_id: i64,
        peer_name: &str,
        limit: Option<i64>,
    ) -> MessagingResult<Vec<MessageView>> {
        let peer = self
            .user_repository
            .find(&UserLookup::Username(peer_name.to_string()))
            .await?
            .ok_or_else(|| MessagingError::DestinationNotFound(format!("user {peer_name}")))?;

        self.message_repository
            .list_for_direct(self_id, peer.id, self.effective_limit(limit))
            .await
    }

    fn effective_limit(&self, limit: Option<i64>) -> i64 {
        match limit {
            Some(value) if value > 0 => value,
            _ => self.default_limit,
        }
    }
}
