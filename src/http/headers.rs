//! Header vocabulary and the options → headers mapping.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::http::request::HttpVerb;
use crate::options::{AccessConditionType, RequestOptions};

/// Header names, lower-cased.
pub mod names {
    pub const ACCEPT: &str = "accept";
    pub const AUTHORIZATION: &str = "authorization";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const ETAG: &str = "etag";
    pub const IF_MATCH: &str = "if-match";
    pub const IF_NONE_MATCH: &str = "if-none-match";
    pub const USER_AGENT: &str = "user-agent";

    pub const ACTIVITY_ID: &str = "x-ms-activity-id";
    pub const CONSISTENCY_LEVEL: &str = "x-ms-consistency-level";
    pub const CONTINUATION: &str = "x-ms-continuation";
    pub const DATE: &str = "x-ms-date";
    pub const INDEXING_DIRECTIVE: &str = "x-ms-indexing-directive";
    pub const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
    pub const OFFER_THROUGHPUT: &str = "x-ms-offer-throughput";
    pub const OFFER_TYPE: &str = "x-ms-offer-type";
    pub const REQUEST_CHARGE: &str = "x-ms-request-charge";
    pub const RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";
    pub const SESSION_TOKEN: &str = "x-ms-session-token";
    pub const SUB_STATUS: &str = "x-ms-substatus";
    pub const VERSION: &str = "x-ms-version";

    pub const ENABLE_CROSS_PARTITION_QUERY: &str = "x-ms-documentdb-query-enablecrosspartition";
    pub const ENABLE_SCAN_IN_QUERY: &str = "x-ms-documentdb-query-enable-scan";
    pub const IS_QUERY: &str = "x-ms-documentdb-isquery";
    pub const IS_UPSERT: &str = "x-ms-documentdb-is-upsert";
    pub const PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
    pub const POPULATE_QUERY_METRICS: &str = "x-ms-documentdb-populatequerymetrics";
    pub const POPULATE_QUOTA_INFO: &str = "x-ms-documentdb-populatequotainfo";
    pub const POST_TRIGGER_INCLUDE: &str = "x-ms-documentdb-post-trigger-include";
    pub const PRE_TRIGGER_INCLUDE: &str = "x-ms-documentdb-pre-trigger-include";
}

pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_QUERY_JSON: &str = "application/query+json";
pub const API_VERSION: &str = "2018-12-31";
pub const USER_AGENT: &str = concat!("docdb-client-rust/", env!("CARGO_PKG_VERSION"));

/// Case-insensitive header map. Keys are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header. Numbers and booleans are stringified.
    pub fn insert(&mut self, name: &str, value: impl ToString) {
        self.0.insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: ToString> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

/// Build the headers every attempt of a call shares.
///
/// Authorization, date, activity id and the per-attempt session token are
/// added later by the request handler.
pub fn request_headers(verb: HttpVerb, options: &RequestOptions, accept: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert(names::ACCEPT, accept);
    headers.insert(names::VERSION, API_VERSION);
    headers.insert(names::USER_AGENT, USER_AGENT);

    if matches!(verb, HttpVerb::Post | HttpVerb::Put) {
        let content_type = match (&options.content_type, options.is_query) {
            (Some(explicit), _) => explicit.as_str(),
            (None, true) => MEDIA_TYPE_QUERY_JSON,
            (None, false) => MEDIA_TYPE_JSON,
        };
        headers.insert(names::CONTENT_TYPE, content_type);
    }

    if let Some(condition) = &options.access_condition {
        let name = match condition.kind {
            AccessConditionType::IfMatch => names::IF_MATCH,
            AccessConditionType::IfNoneMatch => names::IF_NONE_MATCH,
        };
        headers.insert(name, &condition.condition);
    }

    if let Some(key) = &options.partition_key {
        headers.insert(names::PARTITION_KEY, partition_key_header(key));
    }
    if let Some(level) = options.consistency_level {
        headers.insert(names::CONSISTENCY_LEVEL, level.as_str());
    }
    if let Some(token) = &options.session_token {
        headers.insert(names::SESSION_TOKEN, token);
    }
    if let Some(continuation) = &options.continuation {
        headers.insert(names::CONTINUATION, continuation);
    }
    if let Some(count) = options.max_item_count {
        headers.insert(names::MAX_ITEM_COUNT, count);
    }
    if let Some(directive) = options.indexing_directive {
        headers.insert(names::INDEXING_DIRECTIVE, directive.as_str());
    }
    if let Some(offer_type) = &options.offer_type {
        headers.insert(names::OFFER_TYPE, offer_type);
    }
    if let Some(throughput) = options.offer_throughput {
        headers.insert(names::OFFER_THROUGHPUT, throughput);
    }
    if let Some(flag) = options.enable_cross_partition_query {
        headers.insert(names::ENABLE_CROSS_PARTITION_QUERY, flag);
    }
    if let Some(flag) = options.populate_query_metrics {
        headers.insert(names::POPULATE_QUERY_METRICS, flag);
    }
    if let Some(flag) = options.enable_scan_in_query {
        headers.insert(names::ENABLE_SCAN_IN_QUERY, flag);
    }
    if let Some(flag) = options.populate_quota_info {
        headers.insert(names::POPULATE_QUOTA_INFO, flag);
    }
    if let Some(triggers) = &options.pre_trigger_include {
        headers.insert(names::PRE_TRIGGER_INCLUDE, triggers);
    }
    if let Some(triggers) = &options.post_trigger_include {
        headers.insert(names::POST_TRIGGER_INCLUDE, triggers);
    }
    if options.is_query {
        headers.insert(names::IS_QUERY, true);
    }
    if options.is_upsert {
        headers.insert(names::IS_UPSERT, true);
    }

    headers
}

/// Partition keys travel as a JSON array with non-ASCII escaped as `\uXXXX`.
pub fn partition_key_header(key: &serde_json::Value) -> String {
    let json = match key {
        serde_json::Value::Array(_) => key.to_string(),
        scalar => serde_json::Value::Array(vec![scalar.clone()]).to_string(),
    };
    escape_non_ascii(&json)
}

fn escape_non_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AccessCondition, ConsistencyLevel, IndexingDirective};

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("X-MS-Activity-Id", "a1");
        assert_eq!(headers.get("x-ms-activity-id"), Some("a1"));
        assert_eq!(headers.get("X-MS-ACTIVITY-ID"), Some("a1"));
        headers.insert("x-ms-activity-id", "a2");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.remove("X-Ms-Activity-Id"), Some("a2".to_string()));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_partition_key_and_consistency_mapping() {
        let options = RequestOptions::new()
            .with_partition_key("abc")
            .with_consistency_level(ConsistencyLevel::Session);
        let headers = request_headers(HttpVerb::Get, &options, MEDIA_TYPE_JSON);
        assert_eq!(headers.get(names::PARTITION_KEY), Some(r#"["abc"]"#));
        assert_eq!(headers.get(names::CONSISTENCY_LEVEL), Some("Session"));
    }

    #[test]
    fn test_empty_options_emit_no_optional_headers() {
        let headers = request_headers(HttpVerb::Get, &RequestOptions::default(), MEDIA_TYPE_JSON);
        assert!(!headers.contains(names::PARTITION_KEY));
        assert!(!headers.contains(names::CONSISTENCY_LEVEL));
        assert!(!headers.contains(names::SESSION_TOKEN));
        assert!(!headers.contains(names::CONTENT_TYPE));
        assert_eq!(headers.get(names::ACCEPT), Some(MEDIA_TYPE_JSON));
        assert_eq!(headers.get(names::VERSION), Some(API_VERSION));
    }

    #[test]
    fn test_content_type_defaults() {
        let post = request_headers(HttpVerb::Post, &RequestOptions::default(), MEDIA_TYPE_JSON);
        assert_eq!(post.get(names::CONTENT_TYPE), Some(MEDIA_TYPE_JSON));

        let query = RequestOptions {
            is_query: true,
            ..Default::default()
        };
        let query = request_headers(HttpVerb::Post, &query, MEDIA_TYPE_JSON);
        assert_eq!(query.get(names::CONTENT_TYPE), Some(MEDIA_TYPE_QUERY_JSON));
        assert_eq!(query.get(names::IS_QUERY), Some("true"));

        let explicit = RequestOptions {
            content_type: Some("application/json-patch+json".into()),
            ..Default::default()
        };
        let put = request_headers(HttpVerb::Put, &explicit, MEDIA_TYPE_JSON);
        assert_eq!(put.get(names::CONTENT_TYPE), Some("application/json-patch+json"));
    }

    #[test]
    fn test_access_condition_and_misc_mapping() {
        let options = RequestOptions {
            max_item_count: Some(10),
            indexing_directive: Some(IndexingDirective::Exclude),
            offer_throughput: Some(400),
            enable_cross_partition_query: Some(true),
            ..RequestOptions::new().with_access_condition(AccessCondition::if_none_match("\"etag-1\""))
        };
        let headers = request_headers(HttpVerb::Get, &options, MEDIA_TYPE_JSON);
        assert_eq!(headers.get(names::IF_NONE_MATCH), Some("\"etag-1\""));
        assert!(!headers.contains(names::IF_MATCH));
        assert_eq!(headers.get(names::MAX_ITEM_COUNT), Some("10"));
        assert_eq!(headers.get(names::INDEXING_DIRECTIVE), Some("Exclude"));
        assert_eq!(headers.get(names::OFFER_THROUGHPUT), Some("400"));
        assert_eq!(headers.get(names::ENABLE_CROSS_PARTITION_QUERY), Some("true"));
    }

    #[test]
    fn test_partition_key_escapes_non_ascii() {
        let header = partition_key_header(&serde_json::json!("é"));
        assert_eq!(header, r#"["\u00e9"]"#);

        let header = partition_key_header(&serde_json::json!("😀"));
        assert_eq!(header, r#"["\ud83d\ude00"]"#);

        let header = partition_key_header(&serde_json::json!(["a", 1]));
        assert_eq!(header, r#"["a",1]"#);
    }
}
