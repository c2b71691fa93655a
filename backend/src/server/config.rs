//! Process configuration loaded via OrthoConfig.
//!
//! Every key can be set in the environment with the `CANARY_` prefix, for
//! example `CANARY_DATABASE_URL`. Unset keys fall back to the defaults below.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_NTFY_URL: &str = "https://ntfy.sh";
const DEFAULT_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_DOCUMENTS_DIR: &str = "/var/lib/canary/documents";
const DEFAULT_DOCUMENT_EXTENSIONS: &str = "pdf,png,jpg,jpeg,txt,asc,sig";
const DEFAULT_LOGOS_DIR: &str = "/var/lib/canary/logos";
const DEFAULT_LOGO_EXTENSIONS: &str = "png,jpg,jpeg,webp";

/// Errors raised while interpreting configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not a valid URL: '{value}'")]
    InvalidUrl { key: &'static str, value: String },
    #[error("bind_addr is not a socket address: '{value}'")]
    InvalidBindAddr { value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Configuration values for the canary backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CANARY")]
pub struct AppSettings {
    /// PostgreSQL URL. When absent, process-local storage is used.
    pub database_url: Option<String>,
    /// Redis URL for live subscriber channels.
    pub redis_url: Option<String>,
    /// Listen address.
    pub bind_addr: Option<String>,
    /// File holding the cookie signing key shared with the identity service.
    pub session_key_file: Option<PathBuf>,
    /// Generate a throwaway session key when the key file is missing.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: Option<bool>,
    /// Maximum documents per warrant.
    pub documents_max_amount: Option<usize>,
    pub monitor_interval_secs: Option<u64>,
    pub reaper_interval_secs: Option<u64>,
    pub fanout_queue_capacity: Option<usize>,
    /// Timeout for webhook, ntfy, one-time password, and DNS calls.
    pub webhook_timeout_secs: Option<u64>,
    pub ntfy_url: Option<String>,
    /// One-time password validation endpoint of the identity service.
    pub otp_url: Option<String>,
    /// DNS-over-HTTPS resolver used for domain verification.
    pub doh_url: Option<String>,
    pub documents_dir: Option<PathBuf>,
    pub document_max_bytes: Option<u64>,
    /// Comma-separated list of accepted document extensions.
    pub document_extensions: Option<String>,
    pub logos_dir: Option<PathBuf>,
    pub logo_max_bytes: Option<u64>,
    /// Comma-separated list of accepted logo extensions.
    pub logo_extensions: Option<String>,
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidUrl {
        key,
        value: raw.to_owned(),
    })
}

fn positive<T: Default + PartialEq>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

impl AppSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| ConfigError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    pub fn documents_max_amount(&self) -> Result<usize, ConfigError> {
        positive("documents_max_amount", self.documents_max_amount.unwrap_or(5))
    }

    pub fn monitor_interval(&self) -> Result<Duration, ConfigError> {
        positive("monitor_interval_secs", self.monitor_interval_secs.unwrap_or(300))
            .map(Duration::from_secs)
    }

    pub fn reaper_interval(&self) -> Result<Duration, ConfigError> {
        positive("reaper_interval_secs", self.reaper_interval_secs.unwrap_or(600))
            .map(Duration::from_secs)
    }

    pub fn fanout_queue_capacity(&self) -> Result<usize, ConfigError> {
        positive("fanout_queue_capacity", self.fanout_queue_capacity.unwrap_or(1024))
    }

    pub fn outbound_timeout(&self) -> Result<Duration, ConfigError> {
        positive("webhook_timeout_secs", self.webhook_timeout_secs.unwrap_or(10))
            .map(Duration::from_secs)
    }

    pub fn ntfy_url(&self) -> Result<Url, ConfigError> {
        parse_url("ntfy_url", self.ntfy_url.as_deref().unwrap_or(DEFAULT_NTFY_URL))
    }

    pub fn otp_url(&self) -> Result<Option<Url>, ConfigError> {
        self.otp_url
            .as_deref()
            .map(|raw| parse_url("otp_url", raw))
            .transpose()
    }

    pub fn doh_url(&self) -> Result<Url, ConfigError> {
        parse_url("doh_url", self.doh_url.as_deref().unwrap_or(DEFAULT_DOH_URL))
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENTS_DIR))
    }

    pub fn document_max_bytes(&self) -> Result<u64, ConfigError> {
        positive(
            "document_max_bytes",
            self.document_max_bytes.unwrap_or(10 * 1024 * 1024),
        )
    }

    /// Lowercased extensions without the leading dot.
    pub fn document_extensions(&self) -> BTreeSet<String> {
        extension_set(
            self.document_extensions
                .as_deref()
                .unwrap_or(DEFAULT_DOCUMENT_EXTENSIONS),
        )
    }

    pub fn logos_dir(&self) -> PathBuf {
        self.logos_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGOS_DIR))
    }

    pub fn logo_max_bytes(&self) -> Result<u64, ConfigError> {
        positive("logo_max_bytes", self.logo_max_bytes.unwrap_or(1024 * 1024))
    }

    pub fn logo_extensions(&self) -> BTreeSet<String> {
        extension_set(
            self.logo_extensions
                .as_deref()
                .unwrap_or(DEFAULT_LOGO_EXTENSIONS),
        )
    }
}

fn extension_set(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
