//! Delivery transports for notification payloads.
//!
//! [`HttpNotificationTransport`] routes each [`DeliveryTarget`] to the
//! matching channel: webhooks receive the JSON payload, ntfy topics receive
//! a short plain-text summary, and email is logged until an SMTP relay is
//! wired in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::domain::ports::{DeliveryError, NotificationTransport};
use crate::domain::{DeliveryTarget, NotificationKind, NotificationPayload};

const NTFY_TOPIC_MAX: usize = 64;

/// Settings for outbound HTTP delivery.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Base URL of the ntfy server.
    pub ntfy_url: Url,
}

/// Transport delivering to webhooks, ntfy, and (logged) email.
#[derive(Clone)]
pub struct HttpNotificationTransport {
    client: Client,
    ntfy_url: Url,
}

impl HttpNotificationTransport {
    /// Build the transport and its HTTP client.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::Transport`] when the HTTP client cannot be built.
    pub fn new(settings: DeliverySettings) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| DeliveryError::transport(err.to_string()))?;
        Ok(Self {
            client,
            ntfy_url: settings.ntfy_url,
        })
    }

    async fn post_webhook(
        &self,
        raw_url: &str,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let url = webhook_url(raw_url)?;
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|err| DeliveryError::transport(err.without_url().to_string()))?;
        ensure_success(response.status())
    }

    async fn push_ntfy(&self, topic: &str, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let url = ntfy_topic_url(&self.ntfy_url, topic)?;
        let response = self
            .client
            .post(url)
            .header("Title", push_title(payload))
            .body(push_message(payload))
            .send()
            .await
            .map_err(|err| DeliveryError::transport(err.without_url().to_string()))?;
        ensure_success(response.status())
    }
}

fn ensure_success(status: reqwest::StatusCode) -> Result<(), DeliveryError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::rejected(status.as_u16()))
    }
}

/// Parse a user-registered webhook, accepting only HTTP(S).
fn webhook_url(raw: &str) -> Result<Url, DeliveryError> {
    let url = Url::parse(raw).map_err(|err| DeliveryError::invalid_target(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DeliveryError::invalid_target(format!(
            "unsupported webhook scheme '{other}'"
        ))),
    }
}

fn ntfy_topic_url(base: &Url, topic: &str) -> Result<Url, DeliveryError> {
    let valid = !topic.is_empty()
        && topic.len() <= NTFY_TOPIC_MAX
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(DeliveryError::invalid_target(format!(
            "ntfy topic '{topic}' is not allowed"
        )));
    }
    base.join(topic)
        .map_err(|err| DeliveryError::invalid_target(err.to_string()))
}

fn push_title(payload: &NotificationPayload) -> &'static str {
    match payload.kind {
        NotificationKind::Published => "Warrant canary renewed",
        NotificationKind::Overdue => "Warrant canary overdue",
    }
}

fn push_message(payload: &NotificationPayload) -> String {
    let warrant = &payload.warrant;
    match payload.kind {
        NotificationKind::Published => format!(
            "Canary {} published a new warrant (concern: {}). Next renewal due {}.",
            payload.canary_id,
            warrant.statement.concern.as_str(),
            warrant.next_canary.to_rfc3339(),
        ),
        NotificationKind::Overdue => format!(
            "Canary {} missed its renewal deadline of {}.",
            payload.canary_id,
            warrant.next_canary.to_rfc3339(),
        ),
    }
}

#[async_trait]
impl NotificationTransport for HttpNotificationTransport {
    async fn send(
        &self,
        target: &DeliveryTarget,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        match target {
            DeliveryTarget::Webhook { url } => self.post_webhook(url, payload).await,
            DeliveryTarget::Push { topic } => self.push_ntfy(topic, payload).await,
            DeliveryTarget::Email { address } => {
                info!(
                    recipient = %address,
                    canary_id = %payload.canary_id,
                    subject = push_title(payload),
                    "email relay not configured; notification logged"
                );
                Ok(())
            }
        }?;
        debug!(kind = ?payload.kind, canary_id = %payload.canary_id, "notification delivered");
        Ok(())
    }
}
