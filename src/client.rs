//! Client construction and ownership of shared state.
//!
//! # Responsibilities
//! - Validate configuration and build every shared component once
//! - Run the initial location refresh and spawn the periodic one
//! - Stop background work when the client goes away
//!
//! # Design Decisions
//! - The endpoint manager and session container are created here and passed
//!   down explicitly; nothing is global
//! - A failed initial refresh is logged, not fatal: the default endpoint
//!   still serves every request

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{AuthSigner, Credential};
use crate::config::validation::validate_config;
use crate::config::ClientConfig;
use crate::error::{DocDbError, DocDbResult};
use crate::handler::RequestHandler;
use crate::health::{DatabaseAccount, GlobalEndpointManager, LocationRefresher};
use crate::http::{HttpClient, HttpVerb, ReqwestClient, ResourceType, ResponseEnvelope, Transport};
use crate::lifecycle::Shutdown;
use crate::options::RequestOptions;
use crate::session::SessionContainer;

pub struct ClientBuilder {
    config: ClientConfig,
    credential: Option<Credential>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credential: None,
            http_client: None,
        }
    }

    /// Use this credential instead of the one in the config
    /// (the only way to plug in a token provider).
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Replace the reqwest-backed HTTP client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Build the client. Must be called inside a Tokio runtime.
    pub async fn build(self) -> DocDbResult<DocumentClient> {
        validate_config(&self.config).map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            DocDbError::Config(joined.join(", "))
        })?;

        let endpoint = Url::parse(&self.config.endpoint)
            .map_err(|e| DocDbError::Config(format!("invalid endpoint '{}': {e}", self.config.endpoint)))?;
        let policy = Arc::new(self.config.connection_policy.clone());

        let credential = self.credential.or_else(|| self.config.credentials.to_credential());
        if credential.is_none() {
            tracing::warn!("No credential configured; every request will fail authorization");
        }
        let signer = AuthSigner::new(credential)?;

        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new(&policy)?),
        };

        let endpoints = Arc::new(GlobalEndpointManager::new(endpoint.clone(), &policy));
        let sessions = Arc::new(SessionContainer::new());
        let handler = Arc::new(RequestHandler::new(
            policy.clone(),
            endpoints.clone(),
            sessions,
            signer,
            Transport::new(http_client),
        ));

        let shutdown = Shutdown::new();
        if endpoints.discovery_enabled() {
            let refresher = LocationRefresher::new(handler.clone(), policy.endpoint_refresh_interval());
            if let Err(e) = refresher.refresh_once().await {
                tracing::warn!(error = %e, "Initial location refresh failed, using default endpoint");
            }
            tokio::spawn(refresher.run(shutdown.subscribe()));
        }

        tracing::info!(
            endpoint = %endpoint,
            preferred_locations = ?policy.preferred_locations,
            discovery = endpoints.discovery_enabled(),
            "Document client ready"
        );

        Ok(DocumentClient { handler, shutdown })
    }
}

/// Entry point for callers. Dropping it stops background refresh.
pub struct DocumentClient {
    handler: Arc<RequestHandler>,
    shutdown: Shutdown,
}

impl DocumentClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn handler(&self) -> &Arc<RequestHandler> {
        &self.handler
    }

    pub fn endpoints(&self) -> &Arc<GlobalEndpointManager> {
        self.handler.endpoints()
    }

    pub fn sessions(&self) -> &Arc<SessionContainer> {
        self.handler.sessions()
    }

    /// See [`RequestHandler::execute`].
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
        self.handler
            .execute(verb, resource_type, resource_id, path, body, options, abort)
            .await
    }

    /// Read the database account from the default endpoint.
    pub async fn read_database_account(&self) -> DocDbResult<DatabaseAccount> {
        let endpoint = self.endpoints().default_endpoint().clone();
        self.handler.read_database_account(&endpoint).await
    }

    /// Stop background tasks now rather than on drop.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for DocumentClient {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl std::fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient")
            .field("endpoint", self.endpoints().default_endpoint())
            .finish_non_exhaustive()
    }
}
