//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff base <= ceiling)
//! - Check that the endpoint parses and key material decodes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("endpoint", e.to_string())),
    }

    for (field, key) in [
        ("credentials.master_key", &config.credentials.master_key),
        ("credentials.resource_key", &config.credentials.resource_key),
    ] {
        if let Some(key) = key {
            if STANDARD.decode(key.trim()).is_err() {
                errors.push(ValidationError::new(field, "not valid base64"));
            }
        }
    }

    let policy = &config.connection_policy;
    if let Some(proxy) = &policy.proxy_url {
        if let Err(e) = Url::parse(proxy) {
            errors.push(ValidationError::new("connection_policy.proxy_url", e.to_string()));
        }
    }
    if policy.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "connection_policy.request_timeout_ms",
            "must be greater than zero",
        ));
    }
    if policy.endpoint_refresh_interval_secs == 0 {
        errors.push(ValidationError::new(
            "connection_policy.endpoint_refresh_interval_secs",
            "must be greater than zero",
        ));
    }

    let retry = &policy.retry_options;
    if retry.max_wait_time_secs == 0 {
        errors.push(ValidationError::new(
            "connection_policy.retry_options.max_wait_time_secs",
            "must be greater than zero",
        ));
    }
    if retry.base_backoff_ms > retry.max_backoff_ms {
        errors.push(ValidationError::new(
            "connection_policy.retry_options.base_backoff_ms",
            format!(
                "base backoff {}ms exceeds max backoff {}ms",
                retry.base_backoff_ms, retry.max_backoff_ms
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ClientConfig {
        ClientConfig {
            endpoint: "https://account.example.com/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.endpoint = "not a url".into();
        config.credentials.master_key = Some("***".into());
        config.connection_policy.request_timeout_ms = 0;
        config.connection_policy.retry_options.base_backoff_ms = 10_000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "endpoint",
                "credentials.master_key",
                "connection_policy.request_timeout_ms",
                "connection_policy.retry_options.base_backoff_ms",
            ]
        );
    }

    #[test]
    fn test_rejects_unparsable_proxy() {
        let mut config = valid();
        config.connection_policy.proxy_url = Some("not a proxy".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "connection_policy.proxy_url");

        config.connection_policy.proxy_url = Some("http://proxy.internal:3128".into());
        assert!(validate_config(&config).is_ok());
    }
}
