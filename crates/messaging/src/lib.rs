//! # Courier Messaging Crate
//!
//! The message delivery and conversation-resolution core of the Courier
//! backend: attachment staging with compensating rollback, destination
//! resolution (named topics and existing-or-new conversations), message
//! persistence with destination linkage, and bounded history reads.
//!
//! The HTTP boundary validates request shape and authenticates the caller;
//! this crate still defends its own invariants and takes the caller's
//! identity as an explicit argument everywhere.

pub mod services;
pub mod types;

pub use services::{DeliveryService, DestinationService, HistoryService, StagingService};
pub use types::{
    Destination, ResolvedDestination, SendReceipt, SendRequest, UploadedFile,
};
