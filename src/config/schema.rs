//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Credential;
use crate::http::headers::MEDIA_TYPE_JSON;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Account endpoint (e.g., "https://myaccount.documents.example.com:443/").
    pub endpoint: String,

    /// Key or token material.
    pub credentials: CredentialsConfig,

    /// Timeouts, regions and retry limits.
    pub connection_policy: ConnectionPolicy,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Credential material as it appears in a config file.
///
/// A token provider cannot be expressed here; pass it to `ClientBuilder`.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Account master key (base64).
    pub master_key: Option<String>,

    /// Resource-scoped key (base64).
    pub resource_key: Option<String>,

    /// Resource link → pre-issued token.
    pub resource_tokens: HashMap<String, String>,
}

impl CredentialsConfig {
    /// Pick the configured credential, master key first.
    pub fn to_credential(&self) -> Option<Credential> {
        if let Some(key) = &self.master_key {
            return Some(Credential::MasterKey(key.clone()));
        }
        if let Some(key) = &self.resource_key {
            return Some(Credential::ResourceKey(key.clone()));
        }
        if !self.resource_tokens.is_empty() {
            return Some(Credential::ResourceTokens(self.resource_tokens.clone()));
        }
        None
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .field("resource_key", &self.resource_key.as_ref().map(|_| "<redacted>"))
            .field("resource_tokens", &self.resource_tokens.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide connection policy. Read-only once the client is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionPolicy {
    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Accept invalid TLS certificates (local emulators only).
    pub disable_ssl_verification: bool,

    /// HTTP proxy for every request; connections are direct when unset.
    pub proxy_url: Option<String>,

    /// Default `accept` media type.
    pub media_type: String,

    /// Regions in order of preference (names as reported by the account).
    pub preferred_locations: Vec<String>,

    /// Discover regional endpoints from the account; when off, every
    /// request goes to `endpoint`.
    pub enable_endpoint_discovery: bool,

    /// Route writes by preference too, when the account allows it.
    pub use_multiple_write_locations: bool,

    /// How long an unavailable endpoint is skipped before it is retried.
    pub unavailable_endpoint_cooldown_secs: u64,

    /// Interval of the background location refresh in seconds.
    pub endpoint_refresh_interval_secs: u64,

    /// Let the failover strategy retry attempts that hit the request timeout.
    pub retry_on_timeout: bool,

    /// Retry limits.
    pub retry_options: RetryOptions,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
            disable_ssl_verification: false,
            proxy_url: None,
            media_type: MEDIA_TYPE_JSON.to_string(),
            preferred_locations: Vec::new(),
            enable_endpoint_discovery: true,
            use_multiple_write_locations: true,
            unavailable_endpoint_cooldown_secs: 300,
            endpoint_refresh_interval_secs: 300,
            retry_on_timeout: false,
            retry_options: RetryOptions::default(),
        }
    }
}

impl ConnectionPolicy {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn unavailable_endpoint_cooldown(&self) -> Duration {
        Duration::from_secs(self.unavailable_endpoint_cooldown_secs)
    }

    pub fn endpoint_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.endpoint_refresh_interval_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Maximum number of throttling retries.
    pub max_retry_attempt_count: u32,

    /// Fixed delay between throttling retries when the service sends no
    /// retry-after; exponential backoff is used when unset.
    pub fixed_retry_interval_ms: Option<u64>,

    /// Cap on total time spent retrying one call, in seconds.
    pub max_wait_time_secs: u64,

    /// Base delay for exponential backoff in milliseconds.
    pub base_backoff_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_backoff_ms: u64,

    /// Maximum number of endpoint failovers per call.
    pub max_failover_attempts: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retry_attempt_count: 9,
            fixed_retry_interval_ms: None,
            max_wait_time_secs: 30,
            base_backoff_ms: 100,
            max_backoff_ms: 5_000,
            max_failover_attempts: 120,
        }
    }
}

impl RetryOptions {
    pub fn max_wait_time(&self) -> Duration {
        Duration::from_secs(self.max_wait_time_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            endpoint = "https://account.example.com/"

            [credentials]
            master_key = "c2VjcmV0"

            [connection_policy]
            preferred_locations = ["West US", "East US"]

            [connection_policy.retry_options]
            max_retry_attempt_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.connection_policy.preferred_locations.len(), 2);
        assert_eq!(config.connection_policy.retry_options.max_retry_attempt_count, 3);
        assert_eq!(config.connection_policy.retry_options.max_wait_time_secs, 30);
        assert_eq!(config.connection_policy.request_timeout(), Duration::from_secs(60));
        assert!(matches!(
            config.credentials.to_credential(),
            Some(Credential::MasterKey(_))
        ));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = CredentialsConfig {
            master_key: Some("super-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{creds:?}").contains("super-secret"));
    }
}
