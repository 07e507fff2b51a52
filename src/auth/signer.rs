//! Authorization header computation.
//!
//! # Responsibilities
//! - Stamp `x-ms-date` on every signed request
//! - Produce the `authorization` token for the configured credential
//! - Await the token provider when one is configured (the only
//!   suspension point here)

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::credentials::{Credential, TokenProvider, TokenRequest};
use crate::error::{DocDbError, DocDbResult};
use crate::http::headers::names;
use crate::http::{Headers, HttpVerb, ResourceType};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "1.0";

enum Signing {
    Key { kind: &'static str, key: Vec<u8> },
    Tokens(HashMap<String, String>),
    Provider(Arc<dyn TokenProvider>),
}

/// Computes authorization headers. Holds credential material only.
pub struct AuthSigner {
    signing: Option<Signing>,
}

impl AuthSigner {
    /// Decode key material up front so a bad key fails at construction.
    pub fn new(credential: Option<Credential>) -> DocDbResult<Self> {
        let signing = match credential {
            None => None,
            Some(Credential::MasterKey(key)) => Some(Signing::Key {
                kind: "master",
                key: decode_key(&key)?,
            }),
            Some(Credential::ResourceKey(key)) => Some(Signing::Key {
                kind: "resource",
                key: decode_key(&key)?,
            }),
            Some(Credential::ResourceTokens(tokens)) => Some(Signing::Tokens(tokens)),
            Some(Credential::TokenProvider(provider)) => Some(Signing::Provider(provider)),
        };
        Ok(Self { signing })
    }

    pub fn has_credential(&self) -> bool {
        self.signing.is_some()
    }

    /// Add `x-ms-date` and `authorization` to `headers`.
    pub async fn compute_headers(
        &self,
        verb: HttpVerb,
        resource_path: &str,
        resource_id: &str,
        resource_type: ResourceType,
        headers: &mut Headers,
    ) -> DocDbResult<()> {
        let Some(signing) = &self.signing else {
            return Err(DocDbError::Auth("no credential configured".to_string()));
        };

        let date = http_date();
        headers.insert(names::DATE, &date);

        let token = match signing {
            Signing::Key { kind, key } => {
                let signature = signature(key, verb, resource_type, resource_id, &date)?;
                encode_token(kind, &signature)
            }
            Signing::Tokens(tokens) => lookup_resource_token(tokens, resource_path, resource_id)
                .map(str::to_string)
                .ok_or_else(|| {
                    DocDbError::Auth(format!("no resource token covers '{resource_path}'"))
                })?,
            Signing::Provider(provider) => {
                let request = TokenRequest {
                    verb,
                    resource_path,
                    resource_id,
                    resource_type,
                    headers: &*headers,
                };
                provider
                    .token(&request)
                    .await
                    .map_err(|e| DocDbError::Auth(format!("token provider failed: {e}")))?
            }
        };

        headers.insert(names::AUTHORIZATION, token);
        Ok(())
    }
}

impl std::fmt::Debug for AuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.signing {
            None => "none",
            Some(Signing::Key { kind, .. }) => *kind,
            Some(Signing::Tokens(_)) => "resource-tokens",
            Some(Signing::Provider(_)) => "token-provider",
        };
        f.debug_struct("AuthSigner").field("credential", &kind).finish()
    }
}

fn decode_key(key: &str) -> DocDbResult<Vec<u8>> {
    STANDARD
        .decode(key.trim())
        .map_err(|e| DocDbError::Auth(format!("key is not valid base64: {e}")))
}

/// RFC 1123 date, e.g. `Tue, 01 Nov 1994 08:12:31 GMT`.
fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// HMAC-SHA256 over the canonical string, base64 encoded.
pub fn signature(
    key: &[u8],
    verb: HttpVerb,
    resource_type: ResourceType,
    resource_id: &str,
    date: &str,
) -> DocDbResult<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.as_str().to_lowercase(),
        resource_type.as_str().to_lowercase(),
        resource_id,
        date.to_lowercase(),
    );
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| DocDbError::Auth(format!("invalid signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn encode_token(kind: &str, signature: &str) -> String {
    let token = format!("type={kind}&ver={TOKEN_VERSION}&sig={signature}");
    url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
}

/// Exact resource id first, then the nearest ancestor link with a token.
fn lookup_resource_token<'a>(
    tokens: &'a HashMap<String, String>,
    resource_path: &str,
    resource_id: &str,
) -> Option<&'a str> {
    if let Some(token) = tokens.get(resource_id.trim_matches('/')) {
        return Some(token.as_str());
    }
    let segments: Vec<&str> = resource_path.split('/').filter(|s| !s.is_empty()).collect();
    (1..=segments.len())
        .rev()
        .find_map(|len| tokens.get(&segments[..len].join("/")))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const KEY: &str = "c2VjcmV0LWtleS1mb3ItdGVzdHM=";

    #[tokio::test]
    async fn test_master_key_headers() {
        let signer = AuthSigner::new(Some(Credential::MasterKey(KEY.into()))).unwrap();
        let mut headers = Headers::new();
        signer
            .compute_headers(
                HttpVerb::Get,
                "/dbs/db1",
                "dbs/db1",
                ResourceType::Database,
                &mut headers,
            )
            .await
            .unwrap();

        let date = headers.get(names::DATE).unwrap().to_string();
        assert!(date.ends_with("GMT"));

        let expected_sig = signature(
            &STANDARD.decode(KEY).unwrap(),
            HttpVerb::Get,
            ResourceType::Database,
            "dbs/db1",
            &date,
        )
        .unwrap();
        assert_eq!(
            headers.get(names::AUTHORIZATION).unwrap(),
            encode_token("master", &expected_sig)
        );
        assert!(headers
            .get(names::AUTHORIZATION)
            .unwrap()
            .starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"));
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let key = STANDARD.decode(KEY).unwrap();
        let date = "Tue, 01 Nov 1994 08:12:31 GMT";
        let sig = signature(&key, HttpVerb::Post, ResourceType::Item, "dbs/db1/colls/c1", date).unwrap();

        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(b"post\ndocs\ndbs/db1/colls/c1\ntue, 01 nov 1994 08:12:31 gmt\n\n");
        assert_eq!(sig, STANDARD.encode(mac.finalize().into_bytes()));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = AuthSigner::new(Some(Credential::MasterKey("not base64!!".into()))).unwrap_err();
        assert!(matches!(err, DocDbError::Auth(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_is_auth_error() {
        let signer = AuthSigner::new(None).unwrap();
        let mut headers = Headers::new();
        let err = signer
            .compute_headers(HttpVerb::Get, "/dbs", "", ResourceType::Database, &mut headers)
            .await
            .unwrap_err();
        assert!(matches!(err, DocDbError::Auth(_)));
        assert!(!headers.contains(names::AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_resource_token_walks_up_path() {
        let tokens = HashMap::from([("dbs/db1/colls/c1".to_string(), "coll-token".to_string())]);
        let signer = AuthSigner::new(Some(Credential::ResourceTokens(tokens))).unwrap();
        let mut headers = Headers::new();
        signer
            .compute_headers(
                HttpVerb::Get,
                "/dbs/db1/colls/c1/docs/d1",
                "dbs/db1/colls/c1/docs/d1",
                ResourceType::Item,
                &mut headers,
            )
            .await
            .unwrap();
        assert_eq!(headers.get(names::AUTHORIZATION), Some("coll-token"));

        let err = signer
            .compute_headers(
                HttpVerb::Get,
                "/dbs/db2",
                "dbs/db2",
                ResourceType::Database,
                &mut headers,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocDbError::Auth(_)));
    }

    struct StaticProvider;

    #[async_trait]
    impl TokenProvider for StaticProvider {
        async fn token(
            &self,
            request: &TokenRequest<'_>,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok(format!("provided:{}", request.resource_id))
        }
    }

    #[tokio::test]
    async fn test_token_provider() {
        let signer =
            AuthSigner::new(Some(Credential::TokenProvider(Arc::new(StaticProvider)))).unwrap();
        let mut headers = Headers::new();
        signer
            .compute_headers(
                HttpVerb::Delete,
                "/dbs/db1",
                "dbs/db1",
                ResourceType::Database,
                &mut headers,
            )
            .await
            .unwrap();
        assert_eq!(headers.get(names::AUTHORIZATION), Some("provided:dbs/db1"));
        assert!(headers.contains(names::DATE));
    }
}
