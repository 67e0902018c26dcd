//! Delivery coordination: one logical send with all-or-nothing external
//! effect.

use courier_config::StorageConfig;
use courier_database::{
    ConversationRepository, CreateMessageRequest, MessageRepository, MessagingError,
    MessagingResult, TopicRepository,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::services::{DestinationService, StagingService};
use crate::types::{Destination, ResolvedDestination, SendRequest, SendReceipt};

/// Coordinates staging, resolution, persistence, and linkage for a send.
///
/// The walk is Staging, Resolving, Persisting, Linked; any failure after
/// staging rolls the staged files back before the error surfaces, and a
/// failure of the final append additionally deletes the already-created
/// message record so no message exists without being reachable from a
/// destination. Nothing is retried here; a caller retry creates a new
/// message.
///
/// There is no deadline parameter. A send future dropped mid-walk skips
/// the rollback steps and can leave staged files behind.
pub struct DeliveryService {
    staging: StagingService,
    destinations: DestinationService,
    message_repository: MessageRepository,
    topic_repository: TopicRepository,
    conversation_repository: ConversationRepository,
}

impl DeliveryService {
    /// Create a new delivery service instance
    pub fn new(pool: SqlitePool, storage: &StorageConfig) -> Self {
        Self {
            staging: StagingService::new(storage),
            destinations: DestinationService::new(pool.clone()),
            message_repository: MessageRepository::new(pool.clone()),
            topic_repository: TopicRepository::new(pool.clone()),
            conversation_repository: ConversationRepository::new(pool),
        }
    }

    /// Execute one send on behalf of `caller_id`.
    pub async fn send(
        &self,
        request: &SendRequest,
        destination: &Destination,
        caller_id: i64,
    ) -> MessagingResult<SendReceipt> {
        if request.text.trim().is_empty() {
            return Err(MessagingError::Validation(
                "message text must not be empty".to_string(),
            ));
        }

        // Staging: nothing to roll back if this fails.
        let attachment_urls = self.staging.stage(&request.files).await?;

        // Resolving.
        let resolved = match self.destinations.resolve(destination, caller_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.staging.rollback(&attachment_urls).await;
                return Err(e);
            }
        };

        // Persisting.
        let message = match self
            .message_repository
            .create(&CreateMessageRequest {
                text: request.text.clone(),
                sender_id: caller_id,
                attachments: attachment_urls.clone(),
            })
            .await
        {
            Ok(message) => message,
            Err(e) => {
                self.staging.rollback(&attachment_urls).await;
                return Err(e);
            }
        };

        // Linked.
        let (append_result, destination_id) = match &resolved {
            ResolvedDestination::Topic(topic) => (
                self.topic_repository
                    .append_message(topic.id, message.id)
                    .await,
                topic.public_id.clone(),
            ),
            ResolvedDestination::Conversation(conversation) => (
                self.conversation_repository
                    .append_message(conversation.id, message.id)
                    .await,
                conversation.public_id.clone(),
            ),
        };

        if let Err(e) = append_result {
            self.staging.rollback(&attachment_urls).await;

            // Orphan policy: the created-but-unlinked message is deleted.
            // A failed compensation is logged and does not replace the
            // append error.
            if let Err(delete_err) = self.message_repository.delete(message.id).await {
                warn!(
                    message_id = message.id,
                    error = %delete_err,
                    "failed to delete orphaned message after append failure"
                );
            }
            return Err(e);
        }

        info!(
            message_id = message.id,
            public_id = %message.public_id,
            destination_id = %destination_id,
            sender_id = caller_id,
            attachments = attachment_urls.len(),
            "message delivered"
        );

        Ok(SendReceipt {
            message_id: message.public_id,
            destination_id,
            attachment_urls,
        })
    }
}
