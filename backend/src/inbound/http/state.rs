//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CanaryCommand, CanaryQuery, SubscriptionCommand, WarrantCommand, WarrantQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub warrants: Arc<dyn WarrantCommand>,
    pub warrant_query: Arc<dyn WarrantQuery>,
    pub canaries: Arc<dyn CanaryCommand>,
    pub canary_query: Arc<dyn CanaryQuery>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
}
