//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, storage, delivery, collaborators) are
//! implemented by outbound adapters. Driving ports (`*Command`, `*Query`)
//! are implemented by domain services and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod canary_command;
mod canary_query;
mod canary_repository;
mod document_storage;
mod domain_verifier;
mod live_channel;
mod notification_preferences_repository;
mod notification_queue;
mod notification_transport;
mod one_time_password;
mod subscription_command;
mod subscription_repository;
mod trusted_canary_repository;
mod warrant_command;
mod warrant_query;
mod warrant_repository;

#[cfg(test)]
pub use canary_command::MockCanaryCommand;
pub use canary_command::{CanaryCommand, CreateCanaryRequest, TrustCanaryRequest};
#[cfg(test)]
pub use canary_query::MockCanaryQuery;
pub use canary_query::CanaryQuery;
#[cfg(test)]
pub use canary_repository::MockCanaryRepository;
pub use canary_repository::{CanaryRepository, CanaryRepositoryError, LogoUpdate};
#[cfg(test)]
pub use document_storage::MockDocumentStorage;
pub use document_storage::{DocumentStorage, DocumentStorageError, DocumentUpload, StoredDocument};
#[cfg(test)]
pub use domain_verifier::MockDomainVerifier;
pub use domain_verifier::{DomainVerifier, DomainVerifierError};
#[cfg(test)]
pub use live_channel::MockLiveChannel;
pub use live_channel::{LiveChannel, LiveChannelError};
#[cfg(test)]
pub use notification_preferences_repository::MockNotificationPreferencesRepository;
pub use notification_preferences_repository::{
    NotificationPreferencesRepository, NotificationPreferencesRepositoryError,
};
#[cfg(test)]
pub use notification_queue::MockNotificationQueue;
pub use notification_queue::{NotificationQueue, NotificationQueueError};
#[cfg(test)]
pub use notification_transport::MockNotificationTransport;
pub use notification_transport::{DeliveryError, NotificationTransport};
#[cfg(test)]
pub use one_time_password::MockOneTimePasswordValidator;
pub use one_time_password::{OneTimePasswordError, OneTimePasswordValidator};
#[cfg(test)]
pub use subscription_command::MockSubscriptionCommand;
pub use subscription_command::SubscriptionCommand;
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
pub use subscription_repository::{SubscriptionRepository, SubscriptionRepositoryError};
#[cfg(test)]
pub use trusted_canary_repository::MockTrustedCanaryRepository;
pub use trusted_canary_repository::{TrustedCanaryRepository, TrustedCanaryRepositoryError};
#[cfg(test)]
pub use warrant_command::MockWarrantCommand;
pub use warrant_command::{
    AttachDocumentRequest, CreateWarrantRequest, PublishWarrantRequest, WarrantCommand,
};
#[cfg(test)]
pub use warrant_query::MockWarrantQuery;
pub use warrant_query::WarrantQuery;
#[cfg(test)]
pub use warrant_repository::MockWarrantRepository;
pub use warrant_repository::{WarrantRepository, WarrantRepositoryError};
