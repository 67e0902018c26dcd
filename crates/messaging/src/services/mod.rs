//! Service layer for the messaging core

pub mod delivery_service;
pub mod destination_service;
pub mod history_service;
pub mod staging_service;

pub use delivery_service::DeliveryService;
pub use destination_service::DestinationService;
pub use history_service::HistoryService;
pub use staging_service::StagingService;
