//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the canary and warrant model, the warrant state machine,
//! and the services that drive it. Persistence, delivery, and HTTP live
//! behind the traits in [`ports`].
//!
//! Public surface:
//! - [`Canary`], [`CanaryDomain`], [`TrustedCanary`]: monitored domains and
//!   pinned trust anchors.
//! - [`Warrant`], [`PublishedWarrant`], [`Document`]: the warrant state
//!   machine and its read model.
//! - [`NotificationEvent`], [`NotificationPreferences`]: fan-out inputs.
//! - [`CanaryError`]: typed use-case failures; [`Error`]: the
//!   transport-agnostic error payload built from them.
//! - Services: [`WarrantService`], [`CanaryService`],
//!   [`SubscriptionService`], [`NotificationFanOut`], [`RenewalMonitor`],
//!   [`DraftReaper`], and the [`Scheduler`] that runs the last two.

pub mod canary;
pub mod canary_error;
pub mod canary_service;
pub mod error;
pub mod notification;
pub mod notification_fanout;
mod port_error_mapping;
pub mod ports;
pub mod renewal_monitor;
pub mod scheduler;
pub mod subscription_service;
pub mod user;
pub mod warrant;
pub mod warrant_service;

pub use self::canary::{
    CANARY_ABOUT_MAX, CANARY_NAME_MAX, Canary, CanaryDomain, CanaryId, CanaryProfile,
    DOMAIN_MAX_LEN, DomainVerification, PublicCanary, TRUST_ANCHOR_MAX, TrustedCanary,
};
pub use self::canary_error::{CanaryError, CanaryErrorKind};
pub use self::canary_service::CanaryService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::notification::{
    DeliveryTarget, NotificationCategory, NotificationEvent, NotificationKind,
    NotificationPayload, NotificationPreferences, live_channel_name,
};
pub use self::notification_fanout::{FanOutReport, NotificationDispatcher, NotificationFanOut};
pub use self::renewal_monitor::{DraftReaper, MonitorReport, RenewalMonitor};
pub use self::scheduler::{ScheduledJob, Scheduler, SchedulerHandle};
pub use self::subscription_service::SubscriptionService;
pub use self::user::{UserId, UserValidationError};
pub use self::warrant::{
    ConcernLevel, DOCUMENT_FILENAME_MAX, DOCUMENT_HASH_MAX, DRAFT_TTL_HOURS, Document,
    PublishedWarrant, RenewalOffset, SIGNATURE_MAX, STATEMENT_MAX, Warrant, WarrantId,
    WarrantState, WarrantStatement, draft_cutoff, draft_ttl, validate_document_hash,
};
pub use self::warrant_service::{WarrantService, WarrantServicePorts};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use canary_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::unauthorized("login required"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
