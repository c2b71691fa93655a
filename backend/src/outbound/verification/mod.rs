//! Adapters for the identity and domain ownership collaborators.
//!
//! Both fail closed: an unreachable or unconfigured collaborator is reported
//! as unavailable and never treated as a successful check.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::domain::ports::{
    DomainVerifier, DomainVerifierError, OneTimePasswordError, OneTimePasswordValidator,
};
use crate::domain::{CanaryDomain, UserId};

const DNS_TXT: u16 = 16;

fn http_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct OtpCheck<'a> {
    user: &'a UserId,
    code: &'a str,
}

/// Validates one-time passwords against the identity service.
#[derive(Clone)]
pub struct HttpOneTimePasswordValidator {
    client: Client,
    endpoint: Url,
}

impl HttpOneTimePasswordValidator {
    /// Create a validator posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// [`OneTimePasswordError::Unavailable`] when the HTTP client cannot be
    /// built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, OneTimePasswordError> {
        let client = http_client(timeout).map_err(OneTimePasswordError::unavailable)?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl OneTimePasswordValidator for HttpOneTimePasswordValidator {
    async fn validate(&self, user: &UserId, code: &str) -> Result<(), OneTimePasswordError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&OtpCheck { user, code })
            .send()
            .await
            .map_err(|err| OneTimePasswordError::unavailable(err.without_url().to_string()))?;
        classify_otp_status(response.status())
    }
}

fn classify_otp_status(status: StatusCode) -> Result<(), OneTimePasswordError> {
    match status {
        status if status.is_success() => Ok(()),
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNPROCESSABLE_ENTITY => Err(OneTimePasswordError::invalid()),
        other => Err(OneTimePasswordError::unavailable(format!(
            "identity service answered {other}"
        ))),
    }
}

/// Validator used when no identity service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredOneTimePasswordValidator;

#[async_trait]
impl OneTimePasswordValidator for UnconfiguredOneTimePasswordValidator {
    async fn validate(&self, _user: &UserId, _code: &str) -> Result<(), OneTimePasswordError> {
        Err(OneTimePasswordError::unavailable(
            "no identity service configured",
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// Checks domain ownership by looking for the challenge token in the
/// domain's TXT records, resolved over DNS-over-HTTPS.
#[derive(Clone)]
pub struct DohDomainVerifier {
    client: Client,
    resolver: Url,
}

impl DohDomainVerifier {
    /// Create a verifier querying the JSON API at `resolver`.
    ///
    /// # Errors
    ///
    /// [`DomainVerifierError::Unavailable`] when the HTTP client cannot be
    /// built.
    pub fn new(resolver: Url, timeout: Duration) -> Result<Self, DomainVerifierError> {
        let client = http_client(timeout).map_err(DomainVerifierError::unavailable)?;
        Ok(Self { client, resolver })
    }
}

/// Join the quoted character-strings of one TXT record.
fn txt_value(data: &str) -> String {
    data.split('"')
        .enumerate()
        .filter(|(index, _)| index % 2 == 1)
        .map(|(_, chunk)| chunk)
        .collect::<String>()
        .trim()
        .to_owned()
}

fn answers_contain(response: &DohResponse, challenge: &str) -> bool {
    response
        .answer
        .iter()
        .filter(|answer| answer.record_type == DNS_TXT)
        .any(|answer| {
            let value = txt_value(&answer.data);
            value == challenge || (value.is_empty() && answer.data.trim() == challenge)
        })
}

#[async_trait]
impl DomainVerifier for DohDomainVerifier {
    async fn verify(
        &self,
        domain: &CanaryDomain,
        challenge: &str,
    ) -> Result<bool, DomainVerifierError> {
        let response = self
            .client
            .get(self.resolver.clone())
            .query(&[("name", domain.as_str()), ("type", "TXT")])
            .header("accept", "application/dns-json")
            .send()
            .await
            .map_err(|err| DomainVerifierError::unavailable(err.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(DomainVerifierError::unavailable(format!(
                "resolver answered {}",
                response.status()
            )));
        }
        let body: DohResponse = response
            .json()
            .await
            .map_err(|err| DomainVerifierError::unavailable(err.without_url().to_string()))?;
        let found = body.status == 0 && answers_contain(&body, challenge);
        debug!(%domain, rcode = body.status, found, "domain TXT lookup finished");
        Ok(found)
    }
}
