//! Credential material.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::http::{Headers, HttpVerb, ResourceType};

/// Inputs handed to a [`TokenProvider`].
#[derive(Debug)]
pub struct TokenRequest<'a> {
    pub verb: HttpVerb,
    pub resource_path: &'a str,
    pub resource_id: &'a str,
    pub resource_type: ResourceType,
    pub headers: &'a Headers,
}

/// Caller-supplied source of authorization tokens (e.g. a broker service).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// A permission as returned by the permissions feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    #[serde(rename = "resource")]
    pub resource_link: String,
    #[serde(rename = "_token")]
    pub token: String,
}

/// How requests are authorized.
#[derive(Clone)]
pub enum Credential {
    /// Account master key (base64).
    MasterKey(String),
    /// Key scoped to resources (base64); signed like the master key.
    ResourceKey(String),
    /// Pre-issued tokens keyed by resource link (`dbs/a/colls/b`).
    ResourceTokens(HashMap<String, String>),
    TokenProvider(Arc<dyn TokenProvider>),
}

impl Credential {
    /// Collect a permissions feed into resource tokens.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let tokens = permissions
            .into_iter()
            .map(|p| (p.resource_link.trim_matches('/').to_string(), p.token))
            .collect();
        Credential::ResourceTokens(tokens)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::MasterKey(_) => f.write_str("MasterKey(<redacted>)"),
            Credential::ResourceKey(_) => f.write_str("ResourceKey(<redacted>)"),
            Credential::ResourceTokens(tokens) => f
                .debug_tuple("ResourceTokens")
                .field(&tokens.keys().collect::<Vec<_>>())
                .finish(),
            Credential::TokenProvider(_) => f.write_str("TokenProvider(..)"),
        }
    }
}
