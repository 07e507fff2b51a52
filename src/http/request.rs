//! Request descriptors.
//!
//! # Responsibilities
//! - Name the verbs and resource types the service understands
//! - Classify an operation as a read or a write for endpoint selection
//! - Carry the per-call `RequestContext` between attempts

use url::Url;

use crate::options::RequestOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Head => "HEAD",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, HttpVerb::Get | HttpVerb::Head)
    }

    pub fn to_method(self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Head => reqwest::Method::HEAD,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Category of the addressed entity; its path segment is what gets signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    DatabaseAccount,
    Database,
    Container,
    Item,
    StoredProcedure,
    Trigger,
    UserDefinedFunction,
    User,
    Permission,
    Offer,
    Conflict,
    PartitionKeyRange,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::DatabaseAccount => "",
            ResourceType::Database => "dbs",
            ResourceType::Container => "colls",
            ResourceType::Item => "docs",
            ResourceType::StoredProcedure => "sprocs",
            ResourceType::Trigger => "triggers",
            ResourceType::UserDefinedFunction => "udfs",
            ResourceType::User => "users",
            ResourceType::Permission => "permissions",
            ResourceType::Offer => "offers",
            ResourceType::Conflict => "conflicts",
            ResourceType::PartitionKeyRange => "pkranges",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        let resource_type = match segment {
            "dbs" => ResourceType::Database,
            "colls" => ResourceType::Container,
            "docs" => ResourceType::Item,
            "sprocs" => ResourceType::StoredProcedure,
            "triggers" => ResourceType::Trigger,
            "udfs" => ResourceType::UserDefinedFunction,
            "users" => ResourceType::User,
            "permissions" => ResourceType::Permission,
            "offers" => ResourceType::Offer,
            "conflicts" => ResourceType::Conflict,
            "pkranges" => ResourceType::PartitionKeyRange,
            _ => return None,
        };
        Some(resource_type)
    }
}

/// Split a resource path into the type and id used for signing.
///
/// `/dbs/a/colls/b` addresses a container (`colls`, `dbs/a/colls/b`);
/// `/dbs/a/colls` is the container feed of database `a` (`colls`, `dbs/a`).
pub fn parse_resource_path(path: &str) -> Option<(ResourceType, String)> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Some((ResourceType::DatabaseAccount, String::new()));
    }
    if segments.len() % 2 == 0 {
        let resource_type = ResourceType::from_segment(segments[segments.len() - 2])?;
        Some((resource_type, segments.join("/")))
    } else {
        let resource_type = ResourceType::from_segment(segments[segments.len() - 1])?;
        Some((resource_type, segments[..segments.len() - 1].join("/")))
    }
}

/// Which endpoint list an operation is routed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// Per-call descriptor. Retry fields change only through `RetryDecision::apply`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub verb: HttpVerb,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub path: String,
    pub partition_key: Option<serde_json::Value>,
    pub is_query: bool,
    pub idempotent: bool,
    /// Endpoint of the current (or last) attempt.
    pub endpoint: Option<Url>,
    /// Endpoint the next attempt must use instead of resolving one.
    pub endpoint_override: Option<Url>,
    pub retry_count: u32,
    pub session_token: Option<String>,
    /// Endpoints abandoned by failover during this call.
    pub failed_endpoints: Vec<Url>,
}

impl RequestContext {
    pub fn new(
        verb: HttpVerb,
        resource_type: ResourceType,
        resource_id: &str,
        path: &str,
        options: &RequestOptions,
    ) -> Self {
        Self {
            verb,
            resource_type,
            resource_id: resource_id.to_string(),
            path: path.to_string(),
            partition_key: options.partition_key.clone(),
            is_query: options.is_query,
            idempotent: options.idempotent,
            endpoint: None,
            endpoint_override: None,
            retry_count: 0,
            session_token: options.session_token.clone(),
            failed_endpoints: Vec::new(),
        }
    }

    /// Queries are POSTs but read data, so they route like reads.
    pub fn operation_kind(&self) -> OperationKind {
        if self.verb.is_read() || self.is_query {
            OperationKind::Read
        } else {
            OperationKind::Write
        }
    }
}
