//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer. Conversions into domain
//! types trust the database constraints and do not revalidate input
//! lengths.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Canary, CanaryDomain, CanaryId, CanaryProfile, ConcernLevel, Document, DomainVerification,
    NotificationPreferences, TrustedCanary, UserId, Warrant, WarrantId, WarrantStatement,
};

use super::schema::{canaries, canary_warrants, notification_preferences, trusted_canaries};

/// Reasons a stored row cannot be turned back into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("corrupt {table} row: {message}")]
pub(crate) struct RowDecodeError {
    table: &'static str,
    message: String,
}

impl RowDecodeError {
    fn new(table: &'static str, message: impl Into<String>) -> Self {
        Self {
            table,
            message: message.into(),
        }
    }
}

/// Row struct for the canaries table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = canaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CanaryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain: String,
    pub name: String,
    pub about: String,
    pub verification_completed: bool,
    pub verification_code: String,
    pub logo: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<&Canary> for CanaryRow {
    fn from(canary: &Canary) -> Self {
        Self {
            id: *canary.id.as_uuid(),
            user_id: *canary.owner.as_uuid(),
            domain: canary.domain.as_str().to_owned(),
            name: canary.profile.name.clone(),
            about: canary.profile.about.clone(),
            verification_completed: canary.verification.completed,
            verification_code: canary.verification.code.clone(),
            logo: canary.logo.clone(),
            created: canary.created,
        }
    }
}

impl TryFrom<CanaryRow> for Canary {
    type Error = RowDecodeError;

    fn try_from(row: CanaryRow) -> Result<Self, Self::Error> {
        let domain = CanaryDomain::new(&row.domain)
            .map_err(|err| RowDecodeError::new("canaries", err.to_string()))?;
        Ok(Self {
            id: CanaryId::from_uuid(row.id),
            owner: UserId::from_uuid(row.user_id),
            domain,
            profile: CanaryProfile {
                name: row.name,
                about: row.about,
            },
            verification: DomainVerification {
                completed: row.verification_completed,
                code: row.verification_code,
            },
            logo: row.logo,
            created: row.created,
        })
    }
}

/// Row struct for the `canary_warrants` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = canary_warrants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WarrantRow {
    pub id: Uuid,
    pub canary_id: Uuid,
    pub user_id: Uuid,
    pub issued: DateTime<Utc>,
    pub next_canary: DateTime<Utc>,
    pub documents: serde_json::Value,
    pub published: bool,
    pub active: bool,
    pub concern: Option<String>,
    pub statement: Option<String>,
    pub signature: Option<String>,
    pub overdue_notified: bool,
}

/// Encode documents as the stored JSON array.
pub(crate) fn encode_documents(documents: &[Document]) -> Result<serde_json::Value, RowDecodeError> {
    serde_json::to_value(documents)
        .map_err(|err| RowDecodeError::new("canary_warrants", format!("encode documents: {err}")))
}

impl TryFrom<&Warrant> for WarrantRow {
    type Error = RowDecodeError;

    fn try_from(warrant: &Warrant) -> Result<Self, Self::Error> {
        let statement = warrant.statement.as_ref();
        Ok(Self {
            id: *warrant.id.as_uuid(),
            canary_id: *warrant.canary_id.as_uuid(),
            user_id: *warrant.owner.as_uuid(),
            issued: warrant.issued,
            next_canary: warrant.next_canary,
            documents: encode_documents(&warrant.documents)?,
            published: warrant.published,
            active: warrant.active,
            concern: statement.map(|s| s.concern.as_str().to_owned()),
            statement: statement.map(|s| s.statement.clone()),
            signature: statement.map(|s| s.signature.clone()),
            overdue_notified: warrant.overdue_notified,
        })
    }
}

impl TryFrom<WarrantRow> for Warrant {
    type Error = RowDecodeError;

    fn try_from(row: WarrantRow) -> Result<Self, Self::Error> {
        let documents: Vec<Document> = serde_json::from_value(row.documents).map_err(|err| {
            RowDecodeError::new("canary_warrants", format!("decode documents: {err}"))
        })?;
        let statement = match (row.concern, row.statement, row.signature) {
            (Some(concern), Some(statement), Some(signature)) => {
                let concern = ConcernLevel::parse(&concern).ok_or_else(|| {
                    RowDecodeError::new("canary_warrants", format!("unknown concern '{concern}'"))
                })?;
                Some(WarrantStatement {
                    concern,
                    statement,
                    signature,
                })
            }
            _ => None,
        };
        Ok(Self {
            id: WarrantId::from_uuid(row.id),
            canary_id: CanaryId::from_uuid(row.canary_id),
            owner: UserId::from_uuid(row.user_id),
            issued: row.issued,
            next_canary: row.next_canary,
            documents,
            published: row.published,
            active: row.active,
            statement,
            overdue_notified: row.overdue_notified,
        })
    }
}

/// Row struct for the `trusted_canaries` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = trusted_canaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TrustedCanaryRow {
    pub user_id: Uuid,
    pub domain: String,
    pub public_key_hash: String,
}

/// Insertable struct for trust anchors.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trusted_canaries)]
pub(crate) struct NewTrustedCanaryRow<'a> {
    pub user_id: Uuid,
    pub domain: &'a str,
    pub public_key_hash: &'a str,
}

impl TryFrom<TrustedCanaryRow> for TrustedCanary {
    type Error = RowDecodeError;

    fn try_from(row: TrustedCanaryRow) -> Result<Self, Self::Error> {
        let domain = CanaryDomain::new(&row.domain)
            .map_err(|err| RowDecodeError::new("trusted_canaries", err.to_string()))?;
        Ok(Self {
            user: UserId::from_uuid(row.user_id),
            domain,
            public_key_hash: row.public_key_hash,
        })
    }
}

/// Row struct for the `notification_preferences` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = notification_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationPreferencesRow {
    pub email: Option<String>,
    pub email_categories: serde_json::Value,
    pub webhooks: serde_json::Value,
    pub push: serde_json::Value,
}

impl TryFrom<NotificationPreferencesRow> for NotificationPreferences {
    type Error = RowDecodeError;

    fn try_from(row: NotificationPreferencesRow) -> Result<Self, Self::Error> {
        let decode = |err: serde_json::Error| {
            RowDecodeError::new("notification_preferences", err.to_string())
        };
        Ok(Self {
            email: row.email,
            email_categories: serde_json::from_value(row.email_categories).map_err(decode)?,
            webhooks: serde_json::from_value(row.webhooks).map_err(decode)?,
            push: serde_json::from_value(row.push).map_err(decode)?,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::{NotificationCategory, RenewalOffset};
    use crate::test_support::{fixed_now, sample_canary, sample_statement};

    #[rstest]
    fn published_warrant_survives_row_conversion() {
        let owner = UserId::random();
        let canary = sample_canary(&owner, "example.org", true);
        let mut warrant = Warrant::draft(canary.id, owner, RenewalOffset::Month, fixed_now());
        warrant.documents.push(
            Document::new("deadbeef", "report.pdf", "documents/report.pdf", 42)
                .expect("valid document"),
        );
        warrant.publish(sample_statement()).expect("publishes");

        let row = WarrantRow::try_from(&warrant).expect("encodes");
        assert_eq!(row.concern.as_deref(), Some("none"));
        assert_eq!(Warrant::try_from(row).expect("decodes"), warrant);
    }

    #[rstest]
    fn unknown_concern_is_rejected() {
        let owner = UserId::random();
        let canary = sample_canary(&owner, "example.org", true);
        let mut warrant = Warrant::draft(canary.id, owner, RenewalOffset::Month, fixed_now());
        warrant.publish(sample_statement()).expect("publishes");
        let mut row = WarrantRow::try_from(&warrant).expect("encodes");
        row.concern = Some("apocalyptic".to_owned());

        assert!(Warrant::try_from(row).is_err());
    }

    #[rstest]
    fn preferences_decode_snake_case_categories() {
        let row = NotificationPreferencesRow {
            email: Some("ops@example.org".to_owned()),
            email_categories: json!(["canary_subscriptions"]),
            webhooks: json!({"canary_renewals": ["https://hooks.example.org/a"]}),
            push: json!({}),
        };
        let prefs = NotificationPreferences::try_from(row).expect("decodes");
        assert_eq!(
            prefs.email_categories,
            vec![NotificationCategory::CanarySubscriptions]
        );
        assert_eq!(prefs.webhooks.len(), 1);
    }

    #[rstest]
    fn canary_row_keeps_verification_state() {
        let canary = sample_canary(&UserId::random(), "example.org", true);
        let row = CanaryRow::from(&canary);
        assert_eq!(Canary::try_from(row).expect("decodes"), canary);
    }
}
