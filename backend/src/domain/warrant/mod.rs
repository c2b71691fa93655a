//! Warrant aggregate and its lifecycle state machine.
//!
//! A warrant starts as a draft, collects documents, and is published exactly
//! once. Publishing makes it the single active warrant of its canary; a later
//! publish supersedes it. Drafts that are never published expire
//! [`DRAFT_TTL_HOURS`] hours after issuance and disappear rather than
//! transitioning.
//!
//! Everything in this module is pure: persistence adapters express the same
//! transitions as conditional writes, and the in-memory adapter calls these
//! methods directly.

mod statement;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CanaryError, CanaryId, UserId};

pub use statement::{ConcernLevel, STATEMENT_MAX, SIGNATURE_MAX, WarrantStatement};

/// Hours an unpublished draft remains retrievable.
pub const DRAFT_TTL_HOURS: i64 = 3;
/// Maximum accepted length of a client-supplied document hash.
pub const DOCUMENT_HASH_MAX: usize = 64;
/// Maximum accepted length of a document filename.
pub const DOCUMENT_FILENAME_MAX: usize = 255;

/// Fixed lifetime of a draft.
pub fn draft_ttl() -> TimeDelta {
    TimeDelta::hours(DRAFT_TTL_HOURS)
}

/// Oldest `issued` timestamp a draft may have and still be visible at `now`.
pub fn draft_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - draft_ttl()
}

/// Stable warrant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarrantId(Uuid);

impl WarrantId {
    /// Generate a fresh identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for WarrantId {
    type Err = CanaryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| CanaryError::validation("warrant id must be a valid UUID"))
    }
}

impl fmt::Display for WarrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How long after issuance the next warrant is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalOffset {
    /// One day.
    Tomorrow,
    /// Seven days.
    Week,
    /// Fourteen days.
    Fortnight,
    /// Thirty days.
    Month,
    /// Ninety days.
    Quarter,
    /// 365 days.
    Year,
}

impl RenewalOffset {
    /// Offset length in days.
    pub const fn days(self) -> i64 {
        match self {
            Self::Tomorrow => 1,
            Self::Week => 7,
            Self::Fortnight => 14,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// Renewal deadline for a warrant issued at `issued`.
    pub fn deadline_from(self, issued: DateTime<Utc>) -> DateTime<Utc> {
        issued + TimeDelta::days(self.days())
    }
}

/// File attached to a draft warrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Client-supplied content hash. Untrusted; only an integrity aid for
    /// other clients.
    pub hash: String,
    /// Original filename.
    pub filename: String,
    /// Object storage reference.
    pub file_ref: String,
    /// Stored size in bytes.
    pub size: u64,
}

impl Document {
    /// Validate caller-controlled fields and build the value object.
    pub fn new(
        hash: impl Into<String>,
        filename: impl Into<String>,
        file_ref: impl Into<String>,
        size: u64,
    ) -> Result<Self, CanaryError> {
        let hash = hash.into();
        let filename = filename.into();
        validate_document_hash(&hash)?;
        if filename.trim().is_empty() || filename.len() > DOCUMENT_FILENAME_MAX {
            return Err(CanaryError::validation(format!(
                "filename must be between 1 and {DOCUMENT_FILENAME_MAX} bytes"
            )));
        }
        Ok(Self {
            hash,
            filename,
            file_ref: file_ref.into(),
            size,
        })
    }
}

/// Reject empty or oversized document hashes.
pub fn validate_document_hash(hash: &str) -> Result<(), CanaryError> {
    if hash.is_empty() || hash.len() > DOCUMENT_HASH_MAX {
        return Err(CanaryError::validation(format!(
            "document hash must be between 1 and {DOCUMENT_HASH_MAX} characters"
        )));
    }
    Ok(())
}

/// Lifecycle state derived from the `published` and `active` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantState {
    /// Unpublished; documents may still be attached.
    Draft,
    /// Published and currently the canary's valid statement.
    Active,
    /// Published and replaced by a newer publish.
    Superseded,
}

/// One attestation instance of a canary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warrant {
    /// Identifier.
    pub id: WarrantId,
    /// Owning canary.
    pub canary_id: CanaryId,
    /// Owning user.
    pub owner: UserId,
    /// Issuance time; drives draft expiry.
    pub issued: DateTime<Utc>,
    /// Renewal deadline.
    pub next_canary: DateTime<Utc>,
    /// Attached documents, in upload order.
    pub documents: Vec<Document>,
    /// Whether the warrant has been published.
    pub published: bool,
    /// Whether this is the canary's current statement.
    pub active: bool,
    /// Published statement; `None` while drafting.
    pub statement: Option<WarrantStatement>,
    /// Whether the single overdue alert for this warrant has fired.
    pub overdue_notified: bool,
}

impl Warrant {
    /// Create a new draft issued at `now`.
    pub fn draft(
        canary_id: CanaryId,
        owner: UserId,
        offset: RenewalOffset,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WarrantId::random(),
            canary_id,
            owner,
            issued: now,
            next_canary: offset.deadline_from(now),
            documents: Vec::new(),
            published: false,
            active: false,
            statement: None,
            overdue_notified: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WarrantState {
        match (self.published, self.active) {
            (false, _) => WarrantState::Draft,
            (true, true) => WarrantState::Active,
            (true, false) => WarrantState::Superseded,
        }
    }

    /// Whether the warrant is still an unpublished draft.
    pub fn is_draft(&self) -> bool {
        !self.published
    }

    /// Instant after which an unpublished draft is gone.
    pub fn draft_expires_at(&self) -> DateTime<Utc> {
        self.issued + draft_ttl()
    }

    /// Whether the warrant is a draft past its TTL at `now`.
    pub fn is_expired_draft(&self, now: DateTime<Utc>) -> bool {
        self.is_draft() && now >= self.draft_expires_at()
    }

    /// Whether the warrant is a live draft owned by `user` at `now`.
    ///
    /// This single predicate covers ownership, state, and expiry so callers
    /// cannot accidentally distinguish the three.
    pub fn is_open_draft_of(&self, user: &UserId, now: DateTime<Utc>) -> bool {
        self.is_draft() && &self.owner == user && !self.is_expired_draft(now)
    }

    /// Append a document, honouring the configured cap.
    ///
    /// # Errors
    /// [`CanaryError::WarrantNotFound`] when the warrant is no longer a draft,
    /// [`CanaryError::DocumentLimitExceeded`] when `max` documents are already
    /// attached.
    pub fn attach(&mut self, document: Document, max: usize) -> Result<(), CanaryError> {
        if !self.is_draft() {
            return Err(CanaryError::WarrantNotFound);
        }
        if self.documents.len() >= max {
            return Err(CanaryError::DocumentLimitExceeded { max });
        }
        self.documents.push(document);
        Ok(())
    }

    /// Transition a draft to published and active.
    ///
    /// # Errors
    /// [`CanaryError::WarrantNotFound`] when the warrant was already
    /// published.
    pub fn publish(&mut self, statement: WarrantStatement) -> Result<(), CanaryError> {
        if !self.is_draft() {
            return Err(CanaryError::WarrantNotFound);
        }
        self.statement = Some(statement);
        self.published = true;
        self.active = true;
        Ok(())
    }

    /// Mark a published warrant as superseded. Drafts are untouched.
    pub fn supersede(&mut self) {
        self.active = false;
    }

    /// Whether the renewal deadline has passed on the active warrant.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state() == WarrantState::Active && now > self.next_canary
    }

    /// Whether the monitor still owes an overdue alert for this warrant.
    pub fn needs_overdue_alert(&self, now: DateTime<Utc>) -> bool {
        self.is_overdue(now) && !self.overdue_notified
    }
}

/// Resolved snapshot of a published warrant, as served to readers and
/// carried in notification payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedWarrant {
    /// Identifier.
    pub id: WarrantId,
    /// Owning canary.
    pub canary_id: CanaryId,
    /// Issuance time.
    pub issued: DateTime<Utc>,
    /// Renewal deadline.
    pub next_canary: DateTime<Utc>,
    /// Attached documents.
    pub documents: Vec<Document>,
    /// Whether this is the current statement.
    pub active: bool,
    /// Published statement.
    pub statement: WarrantStatement,
}

impl TryFrom<Warrant> for PublishedWarrant {
    type Error = CanaryError;

    fn try_from(value: Warrant) -> Result<Self, Self::Error> {
        let Warrant {
            id,
            canary_id,
            issued,
            next_canary,
            documents,
            published,
            active,
            statement,
            ..
        } = value;
        match (published, statement) {
            (true, Some(statement)) => Ok(Self {
                id,
                canary_id,
                issued,
                next_canary,
                documents,
                active,
                statement,
            }),
            _ => Err(CanaryError::WarrantNotFound),
        }
    }
}
