//! Published statement content.

use serde::{Deserialize, Serialize};

use crate::domain::CanaryError;

/// Maximum statement length in characters.
pub const STATEMENT_MAX: usize = 8192;
/// Maximum detached signature length (base64 ed25519 fits comfortably).
pub const SIGNATURE_MAX: usize = 128;

/// Owner's self-reported level of concern at publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernLevel {
    /// Nothing to report.
    None,
    /// Minor concern.
    Mild,
    /// Notable concern.
    Moderate,
    /// Serious concern.
    Severe,
}

impl ConcernLevel {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }

    /// Parse the storage representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(Self::None),
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

/// Content fixed at publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantStatement {
    /// Concern level.
    pub concern: ConcernLevel,
    /// Free-text declarations.
    pub statement: String,
    /// Client-side signature over the statement.
    pub signature: String,
}

impl WarrantStatement {
    /// Validate lengths and build the statement.
    ///
    /// # Examples
    /// ```
    /// use canary_backend::domain::{ConcernLevel, WarrantStatement};
    ///
    /// let statement = WarrantStatement::new(ConcernLevel::None, "All clear.", "c2ln")
    ///     .expect("valid statement");
    /// assert_eq!(statement.concern, ConcernLevel::None);
    /// ```
    pub fn new(
        concern: ConcernLevel,
        statement: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<Self, CanaryError> {
        let statement = statement.into();
        let signature = signature.into();
        if statement.trim().is_empty() || statement.chars().count() > STATEMENT_MAX {
            return Err(CanaryError::validation(format!(
                "statement must be between 1 and {STATEMENT_MAX} characters"
            )));
        }
        if signature.is_empty() || signature.len() > SIGNATURE_MAX {
            return Err(CanaryError::validation(format!(
                "signature must be between 1 and {SIGNATURE_MAX} characters"
            )));
        }
        Ok(Self {
            concern,
            statement,
            signature,
        })
    }
}
