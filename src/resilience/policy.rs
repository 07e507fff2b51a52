//! Retry and failover decisions.
//!
//! # Responsibilities
//! - Decide, per failed attempt, whether the call is retried
//! - Choose the delay, the endpoint and the session token of the next attempt
//! - Enforce per-strategy budgets and the overall wait cap
//!
//! # Design Decisions
//! - Strategies are a closed enum tried in a fixed order; the first one that
//!   applies owns the decision
//! - Decisions are values; the handler applies them to the context
//! - Marking an endpoint unavailable is the only side effect here

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::config::RetryOptions;
use crate::error::DocDbError;
use crate::health::GlobalEndpointManager;
use crate::http::{HttpVerb, OperationKind, RequestContext};
use crate::resilience::backoff::throttle_delay;
use crate::session::{collection_link, SessionContainer};

/// Sub-status sent alongside 429 by some gateways.
const SUB_STATUS_THROTTLED: u32 = 3200;
/// 403: the region no longer accepts writes.
const SUB_STATUS_WRITE_FORBIDDEN: u32 = 3;
/// 403: the account is not known to this region.
const SUB_STATUS_ACCOUNT_NOT_FOUND: u32 = 1008;
/// 404: the replica has not caught up with the session token.
const SUB_STATUS_READ_SESSION_NOT_AVAILABLE: u32 = 1002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryStrategy {
    Throttling,
    EndpointFailover,
    SessionRead,
}

impl RetryStrategy {
    /// Evaluation order.
    pub const ORDER: [RetryStrategy; 3] = [
        RetryStrategy::Throttling,
        RetryStrategy::EndpointFailover,
        RetryStrategy::SessionRead,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RetryStrategy::Throttling => "throttling",
            RetryStrategy::EndpointFailover => "endpoint_failover",
            RetryStrategy::SessionRead => "session_read",
        }
    }
}

/// What the next attempt does with the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTokenUpdate {
    Keep,
    Replace(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay: Duration,
    /// Endpoint the next attempt must use.
    pub endpoint_override: Option<Url>,
    pub session_token: SessionTokenUpdate,
    pub strategy: Option<RetryStrategy>,
}

impl RetryDecision {
    pub fn no_retry() -> Self {
        Self {
            should_retry: false,
            delay: Duration::ZERO,
            endpoint_override: None,
            session_token: SessionTokenUpdate::Keep,
            strategy: None,
        }
    }

    fn retry(strategy: RetryStrategy, delay: Duration, endpoint_override: Option<Url>) -> Self {
        Self {
            should_retry: true,
            delay,
            endpoint_override,
            session_token: SessionTokenUpdate::Keep,
            strategy: Some(strategy),
        }
    }

    /// Prepare `ctx` for the next attempt.
    pub fn apply(&self, ctx: &mut RequestContext) {
        if !self.should_retry {
            return;
        }
        ctx.retry_count += 1;
        if self.strategy == Some(RetryStrategy::EndpointFailover) {
            if let Some(failed) = ctx.endpoint.clone() {
                if !ctx.failed_endpoints.contains(&failed) {
                    ctx.failed_endpoints.push(failed);
                }
            }
        }
        ctx.endpoint_override = self.endpoint_override.clone();
        match &self.session_token {
            SessionTokenUpdate::Keep => {}
            SessionTokenUpdate::Replace(token) => ctx.session_token = Some(token.clone()),
            SessionTokenUpdate::Clear => ctx.session_token = None,
        }
    }
}

/// Per-call counters. Created when the call starts.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub started_at: Instant,
    pub throttle_attempts: u32,
    pub failover_attempts: u32,
    pub session_attempts: u32,
    /// Endpoints that already answered 404/1002 in this call.
    pub session_tried: Vec<Url>,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            throttle_attempts: 0,
            failover_attempts: 0,
            session_attempts: 0,
            session_tried: Vec::new(),
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

fn is_session_not_available(err: &DocDbError) -> bool {
    err.status_code() == Some(404) && err.sub_status() == Some(SUB_STATUS_READ_SESSION_NOT_AVAILABLE)
}

/// 403 answers that mean the region's role changed under the client.
fn is_region_rejection(err: &DocDbError) -> bool {
    err.status_code() == Some(403)
        && matches!(
            err.sub_status(),
            Some(SUB_STATUS_WRITE_FORBIDDEN | SUB_STATUS_ACCOUNT_NOT_FOUND)
        )
}

#[derive(Debug)]
pub struct RetryPolicy {
    options: RetryOptions,
    retry_on_timeout: bool,
    endpoints: Arc<GlobalEndpointManager>,
    sessions: Arc<SessionContainer>,
}

impl RetryPolicy {
    pub fn new(
        options: RetryOptions,
        retry_on_timeout: bool,
        endpoints: Arc<GlobalEndpointManager>,
        sessions: Arc<SessionContainer>,
    ) -> Self {
        Self {
            options,
            retry_on_timeout,
            endpoints,
            sessions,
        }
    }

    pub fn decide(&self, state: &mut RetryState, ctx: &RequestContext, err: &DocDbError) -> RetryDecision {
        if is_session_not_available(err) {
            if let Some(current) = &ctx.endpoint {
                if !state.session_tried.contains(current) {
                    state.session_tried.push(current.clone());
                }
            }
        }

        if err.is_terminal() {
            return RetryDecision::no_retry();
        }

        for strategy in RetryStrategy::ORDER {
            let proposal = match strategy {
                RetryStrategy::Throttling => self.throttling(state, ctx, err),
                RetryStrategy::EndpointFailover => self.endpoint_failover(state, ctx, err),
                RetryStrategy::SessionRead => self.session_read(state, ctx, err),
            };
            let Some(decision) = proposal else {
                continue;
            };

            let elapsed = state.started_at.elapsed();
            if elapsed + decision.delay > self.options.max_wait_time() {
                tracing::debug!(
                    strategy = strategy.name(),
                    elapsed = ?elapsed,
                    delay = ?decision.delay,
                    max_wait = ?self.options.max_wait_time(),
                    "Retry would exceed max wait time"
                );
                return RetryDecision::no_retry();
            }

            match strategy {
                RetryStrategy::Throttling => state.throttle_attempts += 1,
                RetryStrategy::EndpointFailover => state.failover_attempts += 1,
                RetryStrategy::SessionRead => state.session_attempts += 1,
            }
            return decision;
        }

        RetryDecision::no_retry()
    }

    fn throttling(&self, state: &RetryState, ctx: &RequestContext, err: &DocDbError) -> Option<RetryDecision> {
        let throttled = err.status_code() == Some(429) || err.sub_status() == Some(SUB_STATUS_THROTTLED);
        if !throttled || state.throttle_attempts >= self.options.max_retry_attempt_count {
            return None;
        }

        let delay = throttle_delay(state.throttle_attempts + 1, err.retry_after(), &self.options);
        Some(RetryDecision::retry(
            RetryStrategy::Throttling,
            delay,
            ctx.endpoint.clone(),
        ))
    }

    fn endpoint_failover(
        &self,
        state: &RetryState,
        ctx: &RequestContext,
        err: &DocDbError,
    ) -> Option<RetryDecision> {
        if !self.is_endpoint_failure(err) {
            return None;
        }
        // A refused request was never applied; any verb may move on.
        let rejected = is_region_rejection(err);
        if !rejected && !self.failover_allowed(ctx) {
            return None;
        }

        let current = ctx.endpoint.as_ref()?;
        self.endpoints.mark_unavailable(current, Instant::now());
        if rejected {
            self.endpoints.request_refresh();
        }

        if state.failover_attempts >= self.options.max_failover_attempts {
            return None;
        }

        let next = self
            .endpoints
            .candidates(ctx.operation_kind())
            .into_iter()
            .find(|url| url != current && !ctx.failed_endpoints.contains(url))?;

        Some(RetryDecision::retry(
            RetryStrategy::EndpointFailover,
            Duration::ZERO,
            Some(next),
        ))
    }

    fn is_endpoint_failure(&self, err: &DocDbError) -> bool {
        match err {
            DocDbError::Transport(e) => e.is_connection_level(),
            DocDbError::Timeout(_) => self.retry_on_timeout,
            DocDbError::Service(envelope) => envelope.code == 503 || is_region_rejection(err),
            _ => false,
        }
    }

    /// Reads always; writes only where other regions accept them. A create
    /// may already have landed, so it also needs the caller's word that
    /// repeating it is harmless.
    fn failover_allowed(&self, ctx: &RequestContext) -> bool {
        if ctx.operation_kind() == OperationKind::Read {
            return true;
        }
        let multi_write = self.endpoints.multiple_write_enabled();
        match ctx.verb {
            HttpVerb::Post => multi_write && ctx.idempotent,
            _ => multi_write,
        }
    }

    /// Next replica not yet asked in this call. The same endpoint is asked
    /// again only when a newer session token is known for the collection.
    fn session_read(&self, state: &RetryState, ctx: &RequestContext, err: &DocDbError) -> Option<RetryDecision> {
        if !is_session_not_available(err) || ctx.operation_kind() != OperationKind::Read {
            return None;
        }

        let candidates = self.endpoints.candidates(OperationKind::Read);
        if state.session_attempts as usize > candidates.len() {
            return None;
        }

        let known = collection_link(&ctx.path).and_then(|link| self.sessions.get(&link));
        let advances = known.is_some() && known != ctx.session_token;
        let session_token = match known {
            Some(token) => SessionTokenUpdate::Replace(token),
            None => SessionTokenUpdate::Clear,
        };

        let target = match candidates.into_iter().find(|url| !state.session_tried.contains(url)) {
            Some(untried) => untried,
            None if advances => ctx.endpoint.clone()?,
            None => return None,
        };

        Some(RetryDecision {
            session_token,
            ..RetryDecision::retry(RetryStrategy::SessionRead, Duration::ZERO, Some(target))
        })
    }
}
