//! Canary registration, verification, deletion, logos, and trust anchors.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::port_error_mapping::{
    map_canary_error, map_otp_error, map_storage_error, map_trusted_error, map_verifier_error,
};
use crate::domain::ports::{
    CanaryCommand, CanaryQuery, CanaryRepository, CreateCanaryRequest, DocumentStorage,
    DocumentUpload, DomainVerifier, LogoUpdate, OneTimePasswordValidator, TrustCanaryRequest,
    TrustedCanaryRepository,
};
use crate::domain::{Canary, CanaryDomain, CanaryError, PublicCanary, TrustedCanary, UserId};

/// Canary service implementing [`CanaryCommand`] and [`CanaryQuery`].
pub struct CanaryService<C, T, V, O: ?Sized, L> {
    canaries: Arc<C>,
    trusted: Arc<T>,
    verifier: Arc<V>,
    otp: Arc<O>,
    logos: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<C, T, V, O: ?Sized, L> Clone for CanaryService<C, T, V, O, L> {
    fn clone(&self) -> Self {
        Self {
            canaries: Arc::clone(&self.canaries),
            trusted: Arc::clone(&self.trusted),
            verifier: Arc::clone(&self.verifier),
            otp: Arc::clone(&self.otp),
            logos: Arc::clone(&self.logos),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C, T, V, O: ?Sized, L> CanaryService<C, T, V, O, L> {
    /// Create the service from its driven ports.
    pub fn new(
        canaries: Arc<C>,
        trusted: Arc<T>,
        verifier: Arc<V>,
        otp: Arc<O>,
        logos: Arc<L>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            canaries,
            trusted,
            verifier,
            otp,
            logos,
            clock,
        }
    }
}

impl<C, T, V, O: ?Sized, L> CanaryService<C, T, V, O, L>
where
    C: CanaryRepository,
{
    async fn owned(&self, domain: &CanaryDomain, caller: &UserId) -> Result<Canary, CanaryError> {
        self.canaries
            .find_owned(domain, caller)
            .await
            .map_err(map_canary_error)?
            .ok_or(CanaryError::CanaryNotFound)
    }
}

#[async_trait]
impl<C, T, V, O: ?Sized, L> CanaryCommand for CanaryService<C, T, V, O, L>
where
    C: CanaryRepository,
    T: TrustedCanaryRepository,
    V: DomainVerifier,
    O: OneTimePasswordValidator,
    L: DocumentStorage,
{
    async fn create_canary(&self, request: CreateCanaryRequest) -> Result<Canary, CanaryError> {
        let CreateCanaryRequest {
            domain,
            profile,
            caller,
        } = request;
        if self
            .canaries
            .is_domain_taken(&domain, &caller)
            .await
            .map_err(map_canary_error)?
        {
            return Err(CanaryError::CanaryTaken);
        }

        let canary = Canary::register(caller, domain, profile, self.clock.utc());
        self.canaries
            .insert(&canary)
            .await
            .map_err(map_canary_error)?;
        info!(canary_id = %canary.id, domain = %canary.domain, "canary registered");
        Ok(canary)
    }

    async fn verify_canary(&self, domain: &CanaryDomain, caller: &UserId) -> Result<(), CanaryError> {
        let canary = self.owned(domain, caller).await?;
        if canary.is_verified() {
            return Ok(());
        }

        let confirmed = self
            .verifier
            .verify(&canary.domain, &canary.verification.code)
            .await
            .map_err(map_verifier_error)?;
        if !confirmed {
            return Err(CanaryError::DomainVerificationFailed);
        }

        if self
            .canaries
            .mark_verified(&canary.id)
            .await
            .map_err(map_canary_error)?
        {
            info!(canary_id = %canary.id, %domain, "domain verified");
            return Ok(());
        }
        // Lost to a concurrent verification: fine if it was ours.
        if self.owned(domain, caller).await?.is_verified() {
            Ok(())
        } else {
            warn!(canary_id = %canary.id, %domain, "domain already verified by another canary");
            Err(CanaryError::CanaryTaken)
        }
    }

    async fn delete_canary(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
        otp: &str,
    ) -> Result<(), CanaryError> {
        let canary = self.owned(domain, caller).await?;
        self.otp
            .validate(caller, otp)
            .await
            .map_err(map_otp_error)?;
        self.canaries
            .delete(&canary)
            .await
            .map_err(map_canary_error)?;
        info!(canary_id = %canary.id, %domain, "canary deleted");
        Ok(())
    }

    async fn trust_canary(&self, request: TrustCanaryRequest) -> Result<(), CanaryError> {
        let TrustCanaryRequest {
            domain,
            public_key_hash,
            caller,
        } = request;
        let trusted = TrustedCanary::new(caller, domain, public_key_hash)?;
        if self
            .canaries
            .find_by_domain(&trusted.domain)
            .await
            .map_err(map_canary_error)?
            .is_none()
        {
            return Err(CanaryError::CanaryNotFound);
        }
        if self
            .trusted
            .insert(&trusted)
            .await
            .map_err(map_trusted_error)?
        {
            Ok(())
        } else {
            Err(CanaryError::AlreadyTrusted)
        }
    }

    async fn update_logo(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
        upload: DocumentUpload,
    ) -> Result<Canary, CanaryError> {
        let mut canary = self.owned(domain, caller).await?;
        let stored = self.logos.upload(&upload).await.map_err(map_storage_error)?;

        let outcome = self.canaries.set_logo(&canary.id, &stored.file_ref).await;
        let stale = match outcome {
            Ok(LogoUpdate::Replaced { previous }) => previous,
            Ok(LogoUpdate::Missing) => {
                self.discard_logo(&stored.file_ref).await;
                return Err(CanaryError::CanaryNotFound);
            }
            Err(error) => {
                self.discard_logo(&stored.file_ref).await;
                return Err(map_canary_error(error));
            }
        };
        if let Some(previous) = stale {
            self.discard_logo(&previous).await;
        }

        info!(canary_id = %canary.id, %domain, file_ref = %stored.file_ref, "logo updated");
        canary.logo = Some(stored.file_ref);
        Ok(canary)
    }
}

impl<C, T, V, O: ?Sized, L> CanaryService<C, T, V, O, L>
where
    L: DocumentStorage,
{
    async fn discard_logo(&self, file_ref: &str) {
        if let Err(error) = self.logos.remove(file_ref).await {
            warn!(%file_ref, %error, "orphaned logo upload");
        }
    }
}

#[async_trait]
impl<C, T, V, O: ?Sized, L> CanaryQuery for CanaryService<C, T, V, O, L>
where
    C: CanaryRepository,
    T: TrustedCanaryRepository,
    V: Send + Sync,
    O: Send + Sync,
    L: Send + Sync,
{
    async fn list_canaries(&self, caller: &UserId) -> Result<Vec<Canary>, CanaryError> {
        self.canaries
            .list_owned(caller)
            .await
            .map_err(map_canary_error)
    }

    async fn get_canary(&self, domain: &CanaryDomain, caller: &UserId) -> Result<Canary, CanaryError> {
        self.owned(domain, caller).await
    }

    async fn get_public_canary(&self, domain: &CanaryDomain) -> Result<PublicCanary, CanaryError> {
        self.canaries
            .find_by_domain(domain)
            .await
            .map_err(map_canary_error)?
            .map(PublicCanary::from)
            .ok_or(CanaryError::CanaryNotFound)
    }

    async fn get_trusted(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
    ) -> Result<TrustedCanary, CanaryError> {
        self.trusted
            .find(caller, domain)
            .await
            .map_err(map_trusted_error)?
            .ok_or(CanaryError::CanaryNotFound)
    }

    async fn list_trusted(&self, caller: &UserId) -> Result<Vec<TrustedCanary>, CanaryError> {
        self.trusted.list(caller).await.map_err(map_trusted_error)
    }
}

#[cfg(test)]
#[path = "canary_service_tests.rs"]
mod tests;
