//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against an endpoint:
//!     → timeouts.rs (per-attempt deadline raced with the caller's signal)
//!     → On failure: policy.rs (throttling → endpoint failover → session read)
//!     → backoff.rs (delay when the service gave no retry-after)
//!     → timeouts.rs (cancellable sleep before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Writes fail over only where the account accepts them; creates also
//!   need the caller's idempotency tag
//! - Total time spent retrying one call is capped
//! - Strategies form a closed set evaluated in a fixed order

pub mod backoff;
pub mod policy;
pub mod timeouts;

pub use policy::{RetryDecision, RetryPolicy, RetryState, RetryStrategy, SessionTokenUpdate};
