//! Request execution loop.
//!
//! # Responsibilities
//! - Turn one logical operation into a sequence of signed attempts
//! - Route each attempt through the endpoint manager
//! - Feed failures to the retry policy and honor its decisions
//! - Capture session tokens and endpoint health from successes
//!
//! # Design Decisions
//! - Headers common to every attempt are built once; each attempt signs
//!   its own copy
//! - The caller's signal aborts in-flight attempts and pending delays alike
//! - No partial results: the caller sees one envelope or one error

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::auth::AuthSigner;
use crate::config::ConnectionPolicy;
use crate::error::{DocDbError, DocDbResult};
use crate::health::{DatabaseAccount, GlobalEndpointManager};
use crate::http::headers::{names, request_headers};
use crate::http::transport::resolve_url;
use crate::http::{HttpVerb, RequestContext, ResourceType, ResponseEnvelope, Transport, WireRequest};
use crate::observability::metrics;
use crate::options::RequestOptions;
use crate::resilience::timeouts::sleep_or_cancel;
use crate::resilience::{RetryPolicy, RetryState};
use crate::session::SessionContainer;

/// Executes requests for one client. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct RequestHandler {
    policy: Arc<ConnectionPolicy>,
    endpoints: Arc<GlobalEndpointManager>,
    sessions: Arc<SessionContainer>,
    signer: AuthSigner,
    transport: Transport,
    retry_policy: RetryPolicy,
}

impl RequestHandler {
    pub fn new(
        policy: Arc<ConnectionPolicy>,
        endpoints: Arc<GlobalEndpointManager>,
        sessions: Arc<SessionContainer>,
        signer: AuthSigner,
        transport: Transport,
    ) -> Self {
        let retry_policy = RetryPolicy::new(
            policy.retry_options.clone(),
            policy.retry_on_timeout,
            endpoints.clone(),
            sessions.clone(),
        );
        Self {
            policy,
            endpoints,
            sessions,
            signer,
            transport,
            retry_policy,
        }
    }

    pub fn endpoints(&self) -> &Arc<GlobalEndpointManager> {
        &self.endpoints
    }

    pub fn sessions(&self) -> &Arc<SessionContainer> {
        &self.sessions
    }

    /// Run one operation to completion, retrying as the policy allows.
    ///
    /// `resource_id` is the id that gets signed (see
    /// `http::request::parse_resource_path`); `path` is appended to the
    /// endpoint URL.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        verb: HttpVerb,
        resource_type: ResourceType,
        resource_id: &str,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        abort: Option<&CancellationToken>,
    ) -> DocDbResult<ResponseEnvelope> {
        let started = std::time::Instant::now();
        let result = self
            .run(verb, resource_type, resource_id, path, body, options, abort)
            .await;

        let status = match &result {
            Ok(response) => Some(response.status_code),
            Err(e) => e.status_code(),
        };
        metrics::record_request(verb.as_str(), status, started);

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        verb: HttpVerb,
        resource_type: ResourceType,
        resource_id: &str,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        abort: Option<&CancellationToken>,
    ) -> DocDbResult<ResponseEnvelope> {
        if abort.is_some_and(CancellationToken::is_cancelled) {
            return Err(DocDbError::Cancelled);
        }

        let body = body.map(serde_json::to_vec).transpose()?;

        let mut ctx = RequestContext::new(verb, resource_type, resource_id, path, options);
        if ctx.session_token.is_none() && options.uses_session_consistency() {
            ctx.session_token = self.sessions.token_for(path);
        }

        let base_headers = request_headers(verb, options, &self.policy.media_type);
        let mut state = RetryState::new();

        loop {
            let endpoint = match ctx.endpoint_override.take() {
                Some(endpoint) => endpoint,
                None => self.endpoints.resolve_endpoint(ctx.operation_kind()),
            };
            ctx.endpoint = Some(endpoint.clone());

            let mut headers = base_headers.clone();
            match &ctx.session_token {
                Some(token) => headers.insert(names::SESSION_TOKEN, token),
                None => {
                    headers.remove(names::SESSION_TOKEN);
                }
            }
            let activity_id = Uuid::new_v4().to_string();
            headers.insert(names::ACTIVITY_ID, &activity_id);

            self.signer
                .compute_headers(verb, path, resource_id, resource_type, &mut headers)
                .await?;

            let request = WireRequest {
                verb,
                url: resolve_url(&endpoint, path)?,
                headers,
                body: body.clone(),
            };

            tracing::debug!(
                verb = verb.as_str(),
                path = %path,
                endpoint = %endpoint,
                activity_id = %activity_id,
                attempt = ctx.retry_count,
                "Sending request"
            );

            let err = match self
                .transport
                .execute(request, self.policy.request_timeout(), abort, options.raw_body_fallback)
                .await
            {
                Ok(response) => {
                    self.endpoints.mark_available(&endpoint);
                    self.sessions.capture(path, &response.headers);
                    return Ok(response);
                }
                Err(err) => err,
            };

            let decision = self.retry_policy.decide(&mut state, &ctx, &err);
            let Some(strategy) = decision.strategy.filter(|_| decision.should_retry) else {
                tracing::debug!(
                    verb = verb.as_str(),
                    path = %path,
                    activity_id = %activity_id,
                    attempts = ctx.retry_count + 1,
                    error = %err,
                    "Request failed"
                );
                return Err(err);
            };

            tracing::info!(
                verb = verb.as_str(),
                path = %path,
                endpoint = %endpoint,
                activity_id = %activity_id,
                strategy = strategy.name(),
                delay = ?decision.delay,
                retry = ctx.retry_count + 1,
                error = %err,
                "Retrying request"
            );
            metrics::record_retry(strategy.name());

            decision.apply(&mut ctx);
            if sleep_or_cancel(decision.delay, abort).await.is_err() {
                return Err(DocDbError::Cancelled);
            }
        }
    }

    /// Read the database account from one endpoint. Single attempt.
    pub async fn read_database_account(&self, endpoint: &Url) -> DocDbResult<DatabaseAccount> {
        let mut headers = request_headers(HttpVerb::Get, &RequestOptions::default(), &self.policy.media_type);
        headers.insert(names::ACTIVITY_ID, Uuid::new_v4());
        self.signer
            .compute_headers(HttpVerb::Get, "", "", ResourceType::DatabaseAccount, &mut headers)
            .await?;

        let request = WireRequest {
            verb: HttpVerb::Get,
            url: endpoint.clone(),
            headers,
            body: None,
        };
        let response = self
            .transport
            .execute(request, self.policy.request_timeout(), None, false)
            .await?;

        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}
