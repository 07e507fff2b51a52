//! Per-request options supplied by the resource and query layers.
//!
//! Every field maps to at most one wire header (see `http::headers`); a field
//! left at `None` never emits anything.

use serde::{Deserialize, Serialize};

/// Consistency level requested for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    Session,
    Eventual,
    ConsistentPrefix,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::BoundedStaleness => "BoundedStaleness",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::Eventual => "Eventual",
            ConsistencyLevel::ConsistentPrefix => "ConsistentPrefix",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessConditionType {
    IfMatch,
    IfNoneMatch,
}

/// Optimistic-concurrency precondition on an etag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCondition {
    pub kind: AccessConditionType,
    pub condition: String,
}

impl AccessCondition {
    pub fn if_match(etag: impl Into<String>) -> Self {
        Self {
            kind: AccessConditionType::IfMatch,
            condition: etag.into(),
        }
    }

    pub fn if_none_match(etag: impl Into<String>) -> Self {
        Self {
            kind: AccessConditionType::IfNoneMatch,
            condition: etag.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexingDirective {
    Default,
    Include,
    Exclude,
}

impl IndexingDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexingDirective::Default => "Default",
            IndexingDirective::Include => "Include",
            IndexingDirective::Exclude => "Exclude",
        }
    }
}

/// Options for one logical call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Partition key value; scalars are wrapped into a one-element array on the wire.
    pub partition_key: Option<serde_json::Value>,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
    pub continuation: Option<String>,
    pub max_item_count: Option<i32>,
    pub access_condition: Option<AccessCondition>,
    pub indexing_directive: Option<IndexingDirective>,
    pub offer_type: Option<String>,
    pub offer_throughput: Option<u32>,
    pub enable_cross_partition_query: Option<bool>,
    pub populate_query_metrics: Option<bool>,
    pub enable_scan_in_query: Option<bool>,
    pub populate_quota_info: Option<bool>,
    pub pre_trigger_include: Option<String>,
    pub post_trigger_include: Option<String>,
    /// Overrides the default content type of POST/PUT bodies.
    pub content_type: Option<String>,
    /// Marks the request as a query (POST that reads).
    pub is_query: bool,
    pub is_upsert: bool,
    /// Caller asserts that replaying this write cannot duplicate it.
    pub idempotent: bool,
    /// Keep unparsable success bodies as a JSON string instead of failing.
    pub raw_body_fallback: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition_key(mut self, key: impl Into<serde_json::Value>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_access_condition(mut self, condition: AccessCondition) -> Self {
        self.access_condition = Some(condition);
        self
    }

    /// Whether a session token may be attached to this request.
    pub fn uses_session_consistency(&self) -> bool {
        matches!(self.consistency_level, None | Some(ConsistencyLevel::Session))
    }
}
