//! Canary aggregate: a monitored domain with scheduled attestations.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{CanaryError, UserId};

/// Maximum length of a fully qualified domain name.
pub const DOMAIN_MAX_LEN: usize = 253;
/// Maximum length of the display name.
pub const CANARY_NAME_MAX: usize = 64;
/// Maximum length of the free-text description.
pub const CANARY_ABOUT_MAX: usize = 1024;

/// Stable canary identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanaryId(Uuid);

impl CanaryId {
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

impl FromStr for CanaryId {
    type Err = CanaryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| CanaryError::validation("canary id must be a valid UUID"))
    }
}

impl fmt::Display for CanaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Case-normalised domain name.
///
/// ## Invariants
/// - Lowercase, trimmed, at most [`DOMAIN_MAX_LEN`] characters.
/// - Only ASCII letters, digits, `-`, and `.`; no leading or trailing
///   separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanaryDomain(String);

impl CanaryDomain {
    /// Normalise and validate a domain name.
    ///
    /// # Examples
    /// ```
    /// use canary_backend::domain::CanaryDomain;
    ///
    /// let domain = CanaryDomain::new("  Example.ORG ").expect("valid domain");
    /// assert_eq!(domain.as_str(), "example.org");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CanaryError> {
        let normalised = raw.as_ref().trim().to_ascii_lowercase();
        if normalised.is_empty() {
            return Err(CanaryError::validation("domain must not be empty"));
        }
        if normalised.len() > DOMAIN_MAX_LEN {
            return Err(CanaryError::validation(format!(
                "domain must be at most {DOMAIN_MAX_LEN} characters"
            )));
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.';
        if !normalised.chars().all(allowed) {
            return Err(CanaryError::validation(
                "domain may only contain letters, digits, '-' and '.'",
            ));
        }
        let edges = ['.', '-'];
        if normalised.starts_with(edges) || normalised.ends_with(edges) {
            return Err(CanaryError::validation(
                "domain must not start or end with a separator",
            ));
        }
        Ok(Self(normalised))
    }

    /// Borrow the normalised domain.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// SHA-256 hex fingerprint kept after deletion to block re-registration.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CanaryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CanaryDomain> for String {
    fn from(value: CanaryDomain) -> Self {
        value.0
    }
}

impl TryFrom<String> for CanaryDomain {
    type Error = CanaryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// DNS ownership challenge state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerification {
    /// Whether the external verifier confirmed ownership.
    pub completed: bool,
    /// Opaque challenge token the owner publishes in DNS.
    pub code: String,
}

impl DomainVerification {
    /// Start a new, incomplete challenge with 32 random bytes.
    pub fn challenge() -> Self {
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            completed: false,
            code: URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// Display metadata supplied by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanaryProfile {
    /// Short display name.
    pub name: String,
    /// Free-text description.
    pub about: String,
}

impl CanaryProfile {
    /// Validate the profile lengths.
    pub fn new(name: impl Into<String>, about: impl Into<String>) -> Result<Self, CanaryError> {
        let name = name.into().trim().to_owned();
        let about = about.into();
        if name.is_empty() || name.chars().count() > CANARY_NAME_MAX {
            return Err(CanaryError::validation(format!(
                "name must be between 1 and {CANARY_NAME_MAX} characters"
            )));
        }
        if about.chars().count() > CANARY_ABOUT_MAX {
            return Err(CanaryError::validation(format!(
                "about must be at most {CANARY_ABOUT_MAX} characters"
            )));
        }
        Ok(Self { name, about })
    }
}

/// A monitored domain owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canary {
    /// Identifier.
    pub id: CanaryId,
    /// Owning user.
    pub owner: UserId,
    /// Normalised domain.
    pub domain: CanaryDomain,
    /// Display metadata.
    pub profile: CanaryProfile,
    /// Ownership challenge.
    pub verification: DomainVerification,
    /// Object storage reference of the uploaded logo, if any.
    pub logo: Option<String>,
    /// Creation time.
    pub created: DateTime<Utc>,
}

impl Canary {
    /// Build a freshly registered, unverified canary.
    pub fn register(
        owner: UserId,
        domain: CanaryDomain,
        profile: CanaryProfile,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CanaryId::random(),
            owner,
            domain,
            profile,
            verification: DomainVerification::challenge(),
            logo: None,
            created: now,
        }
    }

    /// Whether DNS ownership has been confirmed.
    pub fn is_verified(&self) -> bool {
        self.verification.completed
    }

    /// Whether `user` owns this canary.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

/// Anonymous view of a canary, without the challenge token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCanary {
    /// Identifier.
    pub id: CanaryId,
    /// Normalised domain.
    pub domain: CanaryDomain,
    /// Display metadata.
    pub profile: CanaryProfile,
    /// Whether ownership is verified.
    pub verified: bool,
    /// Logo reference.
    pub logo: Option<String>,
    /// Creation time.
    pub created: DateTime<Utc>,
}

impl From<Canary> for PublicCanary {
    fn from(value: Canary) -> Self {
        Self {
            id: value.id,
            domain: value.domain,
            profile: value.profile,
            verified: value.verification.completed,
            logo: value.logo,
            created: value.created,
        }
    }
}

/// Maximum length of a pinned trust anchor.
pub const TRUST_ANCHOR_MAX: usize = 128;

/// A user-pinned trust anchor (e.g. public key fingerprint) for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedCanary {
    /// Pinning user.
    pub user: UserId,
    /// Pinned domain.
    pub domain: CanaryDomain,
    /// Opaque anchor, typically a signed public key hash.
    pub public_key_hash: String,
}

impl TrustedCanary {
    /// Validate and build a trust record.
    pub fn new(
        user: UserId,
        domain: CanaryDomain,
        public_key_hash: impl Into<String>,
    ) -> Result<Self, CanaryError> {
        let public_key_hash = public_key_hash.into();
        if public_key_hash.trim().is_empty() || public_key_hash.len() > TRUST_ANCHOR_MAX {
            return Err(CanaryError::validation(format!(
                "trust anchor must be between 1 and {TRUST_ANCHOR_MAX} characters"
            )));
        }
        Ok(Self {
            user,
            domain,
            public_key_hash,
        })
    }
}
