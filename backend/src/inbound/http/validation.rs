//! Shared validation helpers for inbound HTTP adapters.
//!
//! Identifier parsing follows the existence-hiding rule: a malformed warrant
//! or canary id is reported exactly like a missing one.

use serde_json::json;

use crate::domain::{
    CanaryDomain, CanaryError, CanaryId, ConcernLevel, Error, RenewalOffset, WarrantId,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("missing required field: {field}")).with_details(json!({
        "field": field,
        "code": ErrorCode::MissingField.as_str(),
    }))
}

pub(crate) fn invalid_value_error(field: FieldName, value: &str, expected: &str) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("{field} must be one of {expected}")).with_details(json!({
        "field": field,
        "value": value,
        "code": ErrorCode::InvalidValue.as_str(),
    }))
}

pub(crate) fn require_field(value: Option<String>, field: FieldName) -> Result<String, Error> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| missing_field_error(field))
}

/// Parse a warrant id; anything malformed is "not found".
pub(crate) fn parse_warrant_id(raw: &str) -> Result<WarrantId, Error> {
    raw.parse::<WarrantId>()
        .map_err(|_| Error::from(CanaryError::WarrantNotFound))
}

/// Parse a canary id on the published feed; anything malformed is "not found".
pub(crate) fn parse_published_canary_id(raw: &str) -> Result<CanaryId, Error> {
    raw.parse::<CanaryId>()
        .map_err(|_| Error::from(CanaryError::WarrantNotFound))
}

/// Parse a canary id for subscription endpoints, where malformed ids
/// degrade to a no-op.
pub(crate) fn parse_subscription_canary_id(raw: &str) -> Option<CanaryId> {
    raw.parse::<CanaryId>().ok()
}

pub(crate) fn parse_domain(raw: &str) -> Result<CanaryDomain, Error> {
    CanaryDomain::new(raw).map_err(Error::from)
}

const OFFSETS: &str = "tomorrow|week|fortnight|month|quarter|year";

pub(crate) fn parse_renewal_offset(raw: &str, field: FieldName) -> Result<RenewalOffset, Error> {
    match raw {
        "tomorrow" => Ok(RenewalOffset::Tomorrow),
        "week" => Ok(RenewalOffset::Week),
        "fortnight" => Ok(RenewalOffset::Fortnight),
        "month" => Ok(RenewalOffset::Month),
        "quarter" => Ok(RenewalOffset::Quarter),
        "year" => Ok(RenewalOffset::Year),
        other => Err(invalid_value_error(field, other, OFFSETS)),
    }
}

pub(crate) fn parse_concern(raw: &str, field: FieldName) -> Result<ConcernLevel, Error> {
    ConcernLevel::parse(raw).ok_or_else(|| invalid_value_error(field, raw, "none|mild|moderate|severe"))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode as DomainCode;

    const FIELD: FieldName = FieldName::new("next");

    #[rstest]
    #[case("not-a-uuid")]
    #[case("")]
    fn malformed_warrant_ids_are_not_found(#[case] raw: &str) {
        let err = parse_warrant_id(raw).expect_err("malformed id");
        assert_eq!(err.code(), DomainCode::NotFound);
    }

    #[rstest]
    fn malformed_published_canary_ids_are_not_found() {
        let err = parse_published_canary_id("1234").expect_err("malformed id");
        assert_eq!(err.code(), DomainCode::NotFound);
    }

    #[rstest]
    fn malformed_subscription_canary_ids_are_ignored() {
        assert!(parse_subscription_canary_id("nope").is_none());
        let id = CanaryId::random();
        assert_eq!(parse_subscription_canary_id(&id.to_string()), Some(id));
    }

    #[rstest]
    #[case("tomorrow", RenewalOffset::Tomorrow)]
    #[case("fortnight", RenewalOffset::Fortnight)]
    #[case("year", RenewalOffset::Year)]
    fn renewal_offsets_parse(#[case] raw: &str, #[case] expected: RenewalOffset) {
        assert_eq!(parse_renewal_offset(raw, FIELD).expect("valid offset"), expected);
    }

    #[rstest]
    fn unknown_offset_reports_field() {
        let err = parse_renewal_offset("decade", FIELD).expect_err("unknown offset");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], "next");
        assert_eq!(details["code"], "invalid_value");
    }

    #[rstest]
    fn blank_required_field_is_missing() {
        let err = require_field(Some("  ".to_owned()), FieldName::new("otp")).expect_err("blank");
        assert_eq!(err.details().expect("details")["code"], "missing_field");
    }
}
