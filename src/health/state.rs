//! Endpoint health state machine.
//!
//! # States
//! - Unknown: never contacted, receives traffic
//! - Live: last contact succeeded
//! - Unavailable: failed recently, skipped until the cooldown passes
//!
//! # State Transitions
//! ```text
//! Unknown → Live:             successful attempt
//! Unknown/Live → Unavailable: endpoint failure seen by the retry policy
//! Unavailable → Unavailable:  another failure, timestamp refreshed
//! Unavailable → Live:         successful attempt, or cooldown elapsed
//! ```
//!
//! # Design Decisions
//! - State is derived from `unavailable_since` and the cooldown, so expiry
//!   needs no timer
//! - `tokio::time::Instant` so paused-clock tests drive the cooldown

use std::time::Duration;

use tokio::time::Instant;
use url::Url;

/// Which list of the account an endpoint was published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Unknown,
    Live,
    Unavailable { since: Instant },
}

/// One regional endpoint as tracked by the endpoint manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Region name as reported by the account (e.g. "West US").
    pub location: String,
    pub url: Url,
    pub role: EndpointRole,
    pub unavailable_since: Option<Instant>,
    /// Set once an attempt against this endpoint succeeded.
    pub verified: bool,
}

impl EndpointRecord {
    pub fn new(location: impl Into<String>, url: Url, role: EndpointRole) -> Self {
        Self {
            location: location.into(),
            url,
            role,
            unavailable_since: None,
            verified: false,
        }
    }

    pub fn state(&self, now: Instant, cooldown: Duration) -> EndpointState {
        match self.unavailable_since {
            Some(since) if now.saturating_duration_since(since) < cooldown => {
                EndpointState::Unavailable { since }
            }
            Some(_) => EndpointState::Live,
            None if self.verified => EndpointState::Live,
            None => EndpointState::Unknown,
        }
    }

    /// True unless the endpoint is inside its cooldown window.
    pub fn is_available(&self, now: Instant, cooldown: Duration) -> bool {
        !matches!(self.state(now, cooldown), EndpointState::Unavailable { .. })
    }
}
