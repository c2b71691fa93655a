//! Warrant canary lifecycle engine.
//!
//! Canaries are domains whose owners periodically publish signed warrants
//! stating whether they have received legal demands. This crate keeps the
//! draft and publish lifecycle, watches for overdue renewals, and fans
//! notifications out to subscribers.
//!
//! - [`domain`]: entities, the warrant state machine, services, and ports.
//! - [`inbound`]: the Actix HTTP adapter.
//! - [`outbound`]: PostgreSQL, in-memory, Redis, HTTP delivery, DNS, and
//!   filesystem adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
