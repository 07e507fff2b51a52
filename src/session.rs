//! Session token tracking.
//!
//! # Responsibilities
//! - Remember the latest `x-ms-session-token` returned for each collection
//! - Supply it to later requests of the same collection
//!
//! # Design Decisions
//! - Keyed by collection link (`dbs/{db}/colls/{coll}`); requests above the
//!   collection level carry no session token
//! - Latest token wins; tokens are opaque and never merged

use dashmap::DashMap;

use crate::http::headers::names;
use crate::http::Headers;

#[derive(Debug, Default)]
pub struct SessionContainer {
    tokens: DashMap<String, String>,
}

impl SessionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection_link: &str) -> Option<String> {
        self.tokens.get(collection_link).map(|t| t.value().clone())
    }

    pub fn set(&self, collection_link: &str, token: &str) {
        self.tokens.insert(collection_link.to_string(), token.to_string());
    }

    /// Capture the token of a response to a request on `path`.
    pub fn capture(&self, path: &str, headers: &Headers) {
        if let (Some(link), Some(token)) = (collection_link(path), headers.get(names::SESSION_TOKEN)) {
            self.set(&link, token);
        }
    }

    /// Token to send for a request on `path`.
    pub fn token_for(&self, path: &str) -> Option<String> {
        collection_link(path).and_then(|link| self.get(&link))
    }

    pub fn remove(&self, collection_link: &str) -> Option<String> {
        self.tokens.remove(collection_link).map(|(_, token)| token)
    }

    pub fn clear(&self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `dbs/{db}/colls/{coll}` prefix of a resource path, if it has one.
pub fn collection_link(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["dbs", db, "colls", coll, ..] => Some(format!("dbs/{db}/colls/{coll}")),
        _ => None,
    }
}
