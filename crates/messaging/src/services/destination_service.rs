//! Destination resolution: named topics and existing-or-new conversations.

use courier_database::{
    Conversation, ConversationRepository, MessagingError, MessagingResult, Topic, TopicRepository,
    UserLookup, UserRepository,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::types::{Destination, ResolvedDestination};

/// Resolves a send's delivery target to its destination record.
pub struct DestinationService {
    topic_repository: TopicRepository,
    conversation_repository: ConversationRepository,
    user_repository: UserRepository,
}

impl DestinationService {
    /// Create a new destination service instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            topic_repository: TopicRepository::new(pool.clone()),
            conversation_repository: ConversationRepository::new(pool.clone()),
            user_repository: UserRepository::new(pool),
        }
    }

    /// Resolve a destination descriptor for a send by `caller_id`.
    pub async fn resolve(
        &self,
        destination: &Destination,
        caller_id: i64,
    ) -> MessagingResult<ResolvedDestination> {
        match destination {
            Destination::Topic(name) => self.resolve_topic(name).await.map(ResolvedDestination::Topic),
            Destination::Peer(identity) => self
                .resolve_or_create_conversation(caller_id, identity)
                .await
                .map(ResolvedDestination::Conversation),
        }
    }

    /// Exact-name topic lookup. Topics are never auto-created by a send.
    pub async fn resolve_topic(&self, name: &str) -> MessagingResult<Topic> {
        self.topic_repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| MessagingError::DestinationNotFound(format!("topic {name}")))
    }

    /// Resolve the conversation between the caller and a peer, creating it
    /// on first contact.
    ///
    /// The peer may be named by username or email. Lookup-then-create is not
    /// atomic, so a lost creation race (unique pair constraint) is absorbed
    /// by re-reading once; if the winning row still cannot be read the
    /// conflict is reported rather than retried further.
    pub async fn resolve_or_create_conversation(
        &self,
        self_id: i64,
        peer_identity: &str,
    ) -> MessagingResult<Conversation> {
        let peer = self
            .user_repository
            .find(&UserLookup::UsernameOrEmail(peer_identity.to_string()))
            .await?
            .ok_or_else(|| MessagingError::DestinationNotFound(format!("user {peer_identity}")))?;

        if let Some(existing) = self
            .conversation_repository
            .find_by_pair(self_id, peer.id)
            .await?
        {
            return Ok(existing);
        }

        match self.conversation_repository.create(self_id, peer.id).await {
            Ok(conversation) => Ok(conversation),
            Err(MessagingError::ConversationExists) => {
                debug!(
                    self_id = self_id,
                    peer_id = peer.id,
                    "lost conversation creation race, re-reading"
                );
                self.conversation_repository
                    .find_by_pair(self_id, peer.id)
                    .await?
                    .ok_or(MessagingError::ConflictRetryExhausted)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_database::{run_migrations, CreateTopicRequest, CreateUserRequest};
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_destinations.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        (pool, temp_dir)
    }

    async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
        let repo = UserRepository::new(pool.clone());
        let (user, _) = repo
            .create(&CreateUserRequest {
                name: username.to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
            })
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_topic_resolution() {
        let (pool, _temp_dir) = create_test_pool().await;
        let topics = TopicRepository::new(pool.clone());
        topics
            .create(
                &CreateTopicRequest {
                    name: "general".to_string(),
                    description: "general talk".to_string(),
                    members: Vec::new(),
                },
                &[],
            )
            .await
            .unwrap();

        let service = DestinationService::new(pool);

        let topic = service.resolve_topic("general").await.unwrap();
        assert_eq!(topic.name, "general");

        let err = service.resolve_topic("missing").await.unwrap_err();
        assert!(matches!(err, MessagingError::DestinationNotFound(_)));
    }

    #[tokio::test]
    async fn test_first_contact_creates_single_conversation() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let _bob = seed_user(&pool, "bob").await;
        let service = DestinationService::new(pool);

        let first = service
            .resolve_or_create_conversation(alice, "bob")
            .await
            .unwrap();
        let second = service
            .resolve_or_create_conversation(alice, "bob@example.com")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_unknown_peer_reported() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let service = DestinationService::new(pool);

        let err = service
            .resolve_or_create_conversation(alice, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, MessagingError::DestinationNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_first_contact_converges() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let service_a = DestinationService::new(pool.clone());
        let service_b = DestinationService::new(pool.clone());

        let (from_alice, from_bob) = tokio::join!(
            service_a.resolve_or_create_conversation(alice, "bob"),
            service_b.resolve_or_create_conversation(bob, "alice"),
        );

        let from_alice = from_alice.unwrap();
        let from_bob = from_bob.unwrap();
        assert_eq!(from_alice.id, from_bob.id);

        let repo = ConversationRepository::new(pool);
        let found = repo.find_by_pair(alice, bob).await.unwrap().unwrap();
        assert_eq!(found.id, from_alice.id);
    }
}
