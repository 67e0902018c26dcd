//! Shared types for the messaging core

use bytes::Bytes;
use courier_database::{Conversation, MessagingError, MessagingResult, Topic};
use serde::{Deserialize, Serialize};

/// An uploaded binary part of a send request, before staging.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// The payload of one send operation.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub text: String,
    pub files: Vec<UploadedFile>,
}

/// The delivery target of a send: a named topic or a peer identity,
/// never both, never neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Topic(String),
    Peer(String),
}

impl Destination {
    /// Build a destination from the two optional request selectors.
    ///
    /// Blank selectors count as absent.
    pub fn from_selectors(
        topic: Option<&str>,
        user: Option<&str>,
    ) -> MessagingResult<Destination> {
        let topic = topic.map(str::trim).filter(|value| !value.is_empty());
        let user = user.map(str::trim).filter(|value| !value.is_empty());

        match (topic, user) {
            (Some(_), Some(_)) => Err(MessagingError::AmbiguousDestination),
            (Some(name), None) => Ok(Destination::Topic(name.to_string())),
            (None, Some(identity)) => Ok(Destination::Peer(identity.to_string())),
            (None, None) => Err(MessagingError::MissingDestination),
        }
    }
}

/// A destination resolved to its destination record.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedDestination {
    Topic(Topic),
    Conversation(Conversation),
}

/// Confirmation returned to the caller after a fully linked send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub destination_id: String,
    pub attachment_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_require_exactly_one() {
        let err = Destination::from_selectors(Some("general"), Some("bob")).unwrap_err();
        assert!(matches!(err, MessagingError::AmbiguousDestination));

        let err = Destination::from_selectors(None, None).unwrap_err();
        assert!(matches!(err, MessagingError::MissingDestination));

        let err = Destination::from_selectors(Some("  "), Some("")).unwrap_err();
        assert!(matches!(err, MessagingError::MissingDestination));
    }

    #[test]
    fn selectors_trim_whitespace() {
        let destination = Destination::from_selectors(Some(" general "), None).unwrap();
        assert_eq!(destination, Destination::Topic("general".to_string()));

        let destination = Destination::from_selectors(None, Some("bob")).unwrap();
        assert_eq!(destination, Destination::Peer("bob".to_string()));
    }
}
