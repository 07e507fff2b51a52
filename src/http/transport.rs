//! One HTTP exchange against one endpoint.
//!
//! # Responsibilities
//! - Send a fully assembled request through an `HttpClient`
//! - Compose the per-attempt deadline with the caller's cancellation signal
//! - Map the abort cause to `Timeout` or `Cancelled`
//! - Classify the raw response (see `response.rs`)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ConnectionPolicy;
use crate::error::{DocDbError, DocDbResult, TransportError};
use crate::http::headers::Headers;
use crate::http::request::HttpVerb;
use crate::http::response::{classify, ResponseEnvelope};
use crate::resilience::timeouts::{run_with_deadline, Aborted};

/// A request ready for the wire. Nothing about it changes once sent.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub verb: HttpVerb,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// Status, headers and body as received.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// The raw exchange. Implementations must be cancel-safe: dropping the
/// returned future aborts the exchange.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError>;
}

/// Production client backed by reqwest's pooled connection manager.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(policy: &ConnectionPolicy) -> DocDbResult<Self> {
        if policy.disable_ssl_verification {
            tracing::warn!("TLS certificate verification disabled");
        }
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(policy.disable_ssl_verification);
        builder = match &policy.proxy_url {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| DocDbError::Config(format!("invalid proxy url '{proxy}': {e}")))?,
            ),
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|e| DocDbError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(request.verb.to_method(), request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_string())))
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Executes single attempts. Retrying is the request handler's job.
#[derive(Clone)]
pub struct Transport {
    client: Arc<dyn HttpClient>,
}

impl Transport {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        request: WireRequest,
        timeout: Duration,
        signal: Option<&CancellationToken>,
        raw_body_fallback: bool,
    ) -> DocDbResult<ResponseEnvelope> {
        let verb = request.verb;
        let url = request.url.clone();

        let raw = match run_with_deadline(self.client.send(request), timeout, signal).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::debug!(verb = verb.as_str(), url = %url, error = %e, "Transport failure");
                return Err(DocDbError::Transport(e));
            }
            Err(Aborted::ByCaller) => {
                tracing::debug!(verb = verb.as_str(), url = %url, "Attempt cancelled by caller");
                return Err(DocDbError::Cancelled);
            }
            Err(Aborted::Deadline(after)) => {
                tracing::warn!(verb = verb.as_str(), url = %url, timeout = ?after, "Attempt timed out");
                return Err(DocDbError::Timeout(after));
            }
        };

        classify(raw, raw_body_fallback)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Append a resource path to an endpoint, keeping any base path the
/// endpoint carries (`https://host/gateway` + `/dbs/db1` is
/// `https://host/gateway/dbs/db1`).
pub fn resolve_url(endpoint: &Url, path: &str) -> DocDbResult<Url> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| DocDbError::Config(format!("invalid resource path '{path}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedClient {
        status: u16,
        body: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl HttpClient for FixedClient {
        async fn send(&self, _request: WireRequest) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse {
                status: self.status,
                headers: Headers::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    struct HangingClient;

    #[async_trait]
    impl HttpClient for HangingClient {
        async fn send(&self, _request: WireRequest) -> Result<RawResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn request() -> WireRequest {
        WireRequest {
            verb: HttpVerb::Get,
            url: Url::parse("https://account.example.com/dbs/db1").unwrap(),
            headers: Headers::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_success_and_error_classification() {
        let ok = Transport::new(Arc::new(FixedClient {
            status: 200,
            body: r#"{"id":"db1"}"#,
            calls: AtomicU32::new(0),
        }));
        let envelope = ok
            .execute(request(), Duration::from_secs(1), None, false)
            .await
            .unwrap();
        assert_eq!(envelope.status_code, 200);

        let missing = Transport::new(Arc::new(FixedClient {
            status: 404,
            body: "",
            calls: AtomicU32::new(0),
        }));
        let err = missing
            .execute(request(), Duration::from_secs(1), None, false)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_exchange_times_out() {
        let transport = Transport::new(Arc::new(HangingClient));
        let err = transport
            .execute(request(), Duration::from_millis(50), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DocDbError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_precancelled_signal_skips_exchange() {
        let client = Arc::new(FixedClient {
            status: 200,
            body: "{}",
            calls: AtomicU32::new(0),
        });
        let transport = Transport::new(client.clone());
        let token = CancellationToken::new();
        token.cancel();
        let err = transport
            .execute(request(), Duration::from_secs(1), Some(&token), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DocDbError::Cancelled));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_url() {
        let endpoint = Url::parse("https://account-westus.example.com:443/").unwrap();
        let url = resolve_url(&endpoint, "/dbs/db1/colls/c1").unwrap();
        assert_eq!(url.as_str(), "https://account-westus.example.com/dbs/db1/colls/c1");
    }

    #[test]
    fn test_resolve_url_keeps_endpoint_base_path() {
        let expected = "https://gateway.example.com/docdb/dbs/db1/colls/c1";
        for endpoint in ["https://gateway.example.com/docdb", "https://gateway.example.com/docdb/"] {
            let url = resolve_url(&Url::parse(endpoint).unwrap(), "/dbs/db1/colls/c1").unwrap();
            assert_eq!(url.as_str(), expected);
        }

        let root = Url::parse("https://gateway.example.com/docdb/").unwrap();
        assert_eq!(resolve_url(&root, "").unwrap().as_str(), "https://gateway.example.com/docdb/");
    }
}
