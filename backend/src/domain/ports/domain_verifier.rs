//! Port for DNS ownership verification.

use async_trait::async_trait;

use crate::domain::CanaryDomain;

use super::define_port_error;

define_port_error! {
    /// Errors raised by domain verifiers.
    pub enum DomainVerifierError {
        /// The resolver could not be reached.
        Unavailable { message: String } =>
            "domain verifier unavailable: {message}",
    }
}

/// Checks whether the challenge token is published for a domain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainVerifier: Send + Sync {
    /// Return `true` when `challenge` is found in the domain's DNS records.
    async fn verify(
        &self,
        domain: &CanaryDomain,
        challenge: &str,
    ) -> Result<bool, DomainVerifierError>;
}
