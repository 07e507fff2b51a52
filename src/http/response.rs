//! Response classification.
//!
//! # Responsibilities
//! - Turn one raw exchange into exactly one of `ResponseEnvelope` / `ErrorEnvelope`
//! - Skip body parsing for 204 and 304
//! - Extract activity id, sub-status and retry-after into typed fields
//!
//! # Design Decisions
//! - Error bodies are handed back as text even when they were JSON
//!   (parsed, then re-serialized)

use std::fmt;

use serde_json::Value;

use crate::error::{DocDbError, DocDbResult};
use crate::http::headers::{names, Headers};
use crate::http::transport::RawResponse;

/// Successful outcome of an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub headers: Headers,
    /// Parsed body; `None` for 204/304 and empty bodies.
    pub result: Option<Value>,
    pub status_code: u16,
}

impl ResponseEnvelope {
    pub fn session_token(&self) -> Option<&str> {
        self.headers.get(names::SESSION_TOKEN)
    }

    pub fn continuation(&self) -> Option<&str> {
        self.headers.get(names::CONTINUATION)
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers.get(names::ETAG)
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.headers.get(names::ACTIVITY_ID)
    }

    /// Request units consumed by the operation.
    pub fn request_charge(&self) -> Option<f64> {
        self.headers
            .get(names::REQUEST_CHARGE)
            .and_then(|v| v.parse().ok())
    }
}

/// Service-side failure (status >= 400).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub sub_status: Option<u32>,
    pub body: String,
    pub headers: Headers,
    pub retry_after_ms: Option<u64>,
    pub activity_id: Option<String>,
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service returned {}", self.code)?;
        if let Some(sub_status) = self.sub_status {
            write!(f, " (sub-status {sub_status})")?;
        }
        if let Some(activity_id) = &self.activity_id {
            write!(f, " [activity {activity_id}]")?;
        }
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// Classify a completed exchange.
pub fn classify(raw: RawResponse, raw_body_fallback: bool) -> DocDbResult<ResponseEnvelope> {
    if raw.status >= 400 {
        return Err(DocDbError::Service(error_envelope(raw)));
    }

    let result = match raw.status {
        204 | 304 => None,
        _ if raw.body.iter().all(u8::is_ascii_whitespace) => None,
        _ => match serde_json::from_slice::<Value>(&raw.body) {
            Ok(value) => Some(value),
            Err(_) if raw_body_fallback => {
                Some(Value::String(String::from_utf8_lossy(&raw.body).into_owned()))
            }
            Err(e) => return Err(DocDbError::Serialization(e)),
        },
    };

    Ok(ResponseEnvelope {
        headers: raw.headers,
        result,
        status_code: raw.status,
    })
}

fn error_envelope(raw: RawResponse) -> ErrorEnvelope {
    let body = match serde_json::from_slice::<Value>(&raw.body) {
        Ok(value) => value.to_string(),
        Err(_) => String::from_utf8_lossy(&raw.body).into_owned(),
    };
    let sub_status = raw
        .headers
        .get(names::SUB_STATUS)
        .and_then(|v| v.trim().parse().ok());
    let retry_after_ms = raw
        .headers
        .get(names::RETRY_AFTER_MS)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| ms.ceil() as u64);
    let activity_id = raw.headers.get(names::ACTIVITY_ID).map(str::to_string);

    ErrorEnvelope {
        code: raw.status,
        sub_status,
        body,
        headers: raw.headers,
        retry_after_ms,
        activity_id,
    }
}
