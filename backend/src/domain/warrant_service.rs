//! Warrant lifecycle service.
//!
//! Implements the warrant driving ports on top of the warrant store. The
//! store performs every transition as a conditional write; this service only
//! checks preconditions that live outside the store (domain verification,
//! second factor, document storage) and hands published events to the
//! notification queue without waiting on delivery.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::port_error_mapping::{
    map_canary_error, map_otp_error, map_storage_error, map_warrant_error,
};
use crate::domain::ports::{
    AttachDocumentRequest, CanaryRepository, CreateWarrantRequest, DocumentStorage,
    NotificationQueue, OneTimePasswordValidator, PublishWarrantRequest, WarrantCommand,
    WarrantQuery, WarrantRepository,
};
use crate::domain::{
    CanaryError, CanaryId, Document, NotificationEvent, PublishedWarrant, UserId, Warrant,
    WarrantId,
};

/// Driven ports the warrant service depends on.
pub struct WarrantServicePorts<W, C, O: ?Sized, S, Q> {
    pub warrants: Arc<W>,
    pub canaries: Arc<C>,
    pub otp: Arc<O>,
    pub storage: Arc<S>,
    pub queue: Arc<Q>,
}

/// Warrant service implementing [`WarrantCommand`] and [`WarrantQuery`].
pub struct WarrantService<W, C, O: ?Sized, S, Q> {
    warrants: Arc<W>,
    canaries: Arc<C>,
    otp: Arc<O>,
    storage: Arc<S>,
    queue: Arc<Q>,
    clock: Arc<dyn Clock>,
    max_documents: usize,
}

impl<W, C, O: ?Sized, S, Q> Clone for WarrantService<W, C, O, S, Q> {
    fn clone(&self) -> Self {
        Self {
            warrants: Arc::clone(&self.warrants),
            canaries: Arc::clone(&self.canaries),
            otp: Arc::clone(&self.otp),
            storage: Arc::clone(&self.storage),
            queue: Arc::clone(&self.queue),
            clock: Arc::clone(&self.clock),
            max_documents: self.max_documents,
        }
    }
}

impl<W, C, O: ?Sized, S, Q> WarrantService<W, C, O, S, Q> {
    /// Create a service capping drafts at `max_documents` attachments.
    pub fn new(
        ports: WarrantServicePorts<W, C, O, S, Q>,
        clock: Arc<dyn Clock>,
        max_documents: usize,
    ) -> Self {
        let WarrantServicePorts {
            warrants,
            canaries,
            otp,
            storage,
            queue,
        } = ports;
        Self {
            warrants,
            canaries,
            otp,
            storage,
            queue,
            clock,
            max_documents,
        }
    }
}

impl<W, C, O: ?Sized, S, Q> WarrantService<W, C, O, S, Q>
where
    W: WarrantRepository,
    Q: NotificationQueue,
{
    async fn open_draft(&self, warrant_id: &WarrantId, caller: &UserId) -> Result<Warrant, CanaryError> {
        self.warrants
            .find_open_draft(warrant_id, caller, self.clock.utc())
            .await
            .map_err(map_warrant_error)?
            .ok_or(CanaryError::WarrantNotFound)
    }

    fn announce(&self, warrant: Warrant) {
        let owner = warrant.owner.clone();
        let warrant_id = warrant.id;
        let snapshot = match PublishedWarrant::try_from(warrant) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%warrant_id, %error, "published warrant has no statement; skipping fan-out");
                return;
            }
        };
        if let Err(error) = self.queue.enqueue(NotificationEvent::published(owner, snapshot)) {
            warn!(%warrant_id, %error, "failed to enqueue published notification");
        }
    }
}

#[async_trait]
impl<W, C, O: ?Sized, S, Q> WarrantCommand for WarrantService<W, C, O, S, Q>
where
    W: WarrantRepository,
    C: CanaryRepository,
    O: OneTimePasswordValidator,
    S: DocumentStorage,
    Q: NotificationQueue,
{
    async fn create_warrant(&self, request: CreateWarrantRequest) -> Result<Warrant, CanaryError> {
        let canary = self
            .canaries
            .find_owned(&request.domain, &request.caller)
            .await
            .map_err(map_canary_error)?
            .ok_or(CanaryError::CanaryNotFound)?;
        if !canary.is_verified() {
            return Err(CanaryError::DomainNotVerified);
        }
        self.otp
            .validate(&request.caller, &request.otp)
            .await
            .map_err(map_otp_error)?;

        let warrant = Warrant::draft(canary.id, request.caller, request.offset, self.clock.utc());
        self.warrants
            .insert(&warrant)
            .await
            .map_err(map_warrant_error)?;
        info!(
            warrant_id = %warrant.id,
            canary_id = %warrant.canary_id,
            next_canary = %warrant.next_canary,
            "draft warrant created"
        );
        Ok(warrant)
    }

    async fn attach_document(&self, request: AttachDocumentRequest) -> Result<(), CanaryError> {
        let AttachDocumentRequest {
            warrant_id,
            hash,
            upload,
            caller,
        } = request;
        let mut document = Document::new(hash, upload.filename.clone(), String::new(), 0)?;

        let draft = self.open_draft(&warrant_id, &caller).await?;
        if draft.documents.len() >= self.max_documents {
            return Err(CanaryError::DocumentLimitExceeded {
                max: self.max_documents,
            });
        }

        let stored = self
            .storage
            .upload(&upload)
            .await
            .map_err(map_storage_error)?;
        document.file_ref = stored.file_ref;
        document.size = stored.size;

        let appended = self
            .warrants
            .append_document(
                &warrant_id,
                &caller,
                &document,
                self.max_documents,
                self.clock.utc(),
            )
            .await
            .map_err(map_warrant_error)?;
        if appended {
            info!(%warrant_id, file_ref = %document.file_ref, "document attached");
            return Ok(());
        }

        // The conditional append lost a race: drop the unreferenced upload,
        // then tell a vanished or published draft apart from a full one.
        if let Err(error) = self.storage.remove(&document.file_ref).await {
            warn!(%warrant_id, file_ref = %document.file_ref, %error, "orphaned document upload");
        }
        match self.open_draft(&warrant_id, &caller).await {
            Ok(_) => Err(CanaryError::DocumentLimitExceeded {
                max: self.max_documents,
            }),
            Err(error) => Err(error),
        }
    }

    async fn publish(&self, request: PublishWarrantRequest) -> Result<(), CanaryError> {
        let PublishWarrantRequest {
            warrant_id,
            statement,
            caller,
        } = request;
        let warrant = self
            .warrants
            .publish(&warrant_id, &caller, &statement, self.clock.utc())
            .await
            .map_err(map_warrant_error)?
            .ok_or(CanaryError::WarrantNotFound)?;
        info!(
            %warrant_id,
            canary_id = %warrant.canary_id,
            documents = warrant.documents.len(),
            "warrant published"
        );
        self.announce(warrant);
        Ok(())
    }
}

#[async_trait]
impl<W, C, O: ?Sized, S, Q> WarrantQuery for WarrantService<W, C, O, S, Q>
where
    W: WarrantRepository,
    C: Send + Sync,
    O: Send + Sync,
    S: Send + Sync,
    Q: NotificationQueue,
{
    async fn get_published(
        &self,
        canary_id: &CanaryId,
        page: u32,
    ) -> Result<PublishedWarrant, CanaryError> {
        let warrant = self
            .warrants
            .find_published(canary_id, page)
            .await
            .map_err(map_warrant_error)?
            .ok_or(CanaryError::WarrantNotFound)?;
        PublishedWarrant::try_from(warrant)
    }

    async fn get_draft(
        &self,
        warrant_id: &WarrantId,
        caller: &UserId,
    ) -> Result<Warrant, CanaryError> {
        self.open_draft(warrant_id, caller).await
    }
}

#[cfg(test)]
#[path = "warrant_service_tests.rs"]
mod tests;
