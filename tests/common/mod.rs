//! Shared utilities for integration and failure-injection testing.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use docdb_client::auth::{AuthSigner, Credential};
use docdb_client::config::ConnectionPolicy;
use docdb_client::error::{TransportError, TransportErrorKind};
use docdb_client::health::{AccountLocation, DatabaseAccount, GlobalEndpointManager};
use docdb_client::http::{Headers, HttpClient, RawResponse, Transport, WireRequest};
use docdb_client::session::SessionContainer;
use docdb_client::RequestHandler;

pub const DEFAULT_ENDPOINT: &str = "https://default.example.com/";
pub const WEST: &str = "https://west.example.com/";
pub const EAST: &str = "https://east.example.com/";
pub const MASTER_KEY: &str = "c2VjcmV0LWtleS1mb3ItdGVzdHM=";

/// One scripted outcome of `ScriptedClient::send`.
#[derive(Debug, Clone)]
pub enum Reply {
    Response {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    ConnectError,
    /// Never completes.
    Hang,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Reply::Response {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Reply::Response {
                status,
                mut headers,
                body,
            } => {
                headers.push((name.to_string(), value.to_string()));
                Reply::Response { status, headers, body }
            }
            other => other,
        }
    }

    pub fn throttled(retry_after_ms: u64) -> Self {
        Self::status(429, r#"{"code":"TooManyRequests"}"#)
            .with_header("x-ms-retry-after-ms", &retry_after_ms.to_string())
    }

    pub fn sub_status(status: u16, sub_status: u32) -> Self {
        Self::status(status, "{}").with_header("x-ms-substatus", &sub_status.to_string())
    }
}

/// `HttpClient` stub with a reply queue per host. The last reply of a
/// queue repeats; unscripted hosts refuse connections.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<WireRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, endpoint: &str, replies: Vec<Reply>) {
        let host = host_of(&Url::parse(endpoint).unwrap());
        self.scripts.lock().unwrap().insert(host, replies.into());
    }

    pub fn calls(&self) -> Vec<WireRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Hosts contacted, in order.
    pub fn hosts(&self) -> Vec<String> {
        self.calls().iter().map(|c| host_of(&c.url)).collect()
    }

    fn next_reply(&self, host: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(host) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::ConnectError),
            None => Reply::ConnectError,
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        let host = host_of(&request.url);
        self.calls.lock().unwrap().push(request);

        match self.next_reply(&host) {
            Reply::Response { status, headers, body } => Ok(RawResponse {
                status,
                headers: headers.into_iter().collect(),
                body: body.into_bytes(),
            }),
            Reply::ConnectError => Err(TransportError::new(
                TransportErrorKind::Connect,
                format!("connection refused by {host}"),
            )),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}

pub fn two_region_account(multi_write: bool) -> DatabaseAccount {
    let locations = vec![
        AccountLocation {
            name: "West US".into(),
            database_account_endpoint: WEST.into(),
        },
        AccountLocation {
            name: "East US".into(),
            database_account_endpoint: EAST.into(),
        },
    ];
    DatabaseAccount {
        writable_locations: locations.clone(),
        readable_locations: locations,
        enable_multiple_write_locations: multi_write,
    }
}

/// Request handler over `client`, signed with a master key.
pub fn handler(
    client: Arc<dyn HttpClient>,
    policy: ConnectionPolicy,
    account: Option<DatabaseAccount>,
) -> RequestHandler {
    handler_with_credential(client, policy, account, Some(Credential::MasterKey(MASTER_KEY.into())))
}

pub fn handler_with_credential(
    client: Arc<dyn HttpClient>,
    policy: ConnectionPolicy,
    account: Option<DatabaseAccount>,
    credential: Option<Credential>,
) -> RequestHandler {
    handler_at(DEFAULT_ENDPOINT, client, policy, account, credential)
}

pub fn handler_at(
    endpoint: &str,
    client: Arc<dyn HttpClient>,
    policy: ConnectionPolicy,
    account: Option<DatabaseAccount>,
    credential: Option<Credential>,
) -> RequestHandler {
    let endpoints = Arc::new(GlobalEndpointManager::new(Url::parse(endpoint).unwrap(), &policy));
    if let Some(account) = account {
        endpoints.update_locations(&account);
    }
    RequestHandler::new(
        Arc::new(policy),
        endpoints,
        Arc::new(SessionContainer::new()),
        AuthSigner::new(credential).unwrap(),
        Transport::new(client),
    )
}

/// What the mock backend saw of a request.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub headers: Headers,
}

/// What the mock backend answers.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Sleep before answering.
    pub delay: Duration,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let reply = f(request).await;
                        if !reply.delay.is_zero() {
                            tokio::time::sleep(reply.delay).await;
                        }

                        let status_text = reason_phrase(reply.status);

                        let mut response = format!("HTTP/1.1 {}\r\n", status_text);
                        for (name, value) in &reply.headers {
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        response.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            reply.body.len(),
                            reply.body
                        ));
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

fn reason_phrase(status: u16) -> String {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        304 => "Not Modified",
        403 => "Forbidden",
        404 => "Not Found",
        412 => "Precondition Failed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    format!("{} {}", status, reason)
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body_read = buf.len() - (header_end + 4);
    while body_read < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    Some(MockRequest { method, path, headers })
}
