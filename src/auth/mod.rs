//! Request authorization.
//!
//! # Data Flow
//! ```text
//! ClientConfig.credentials / ClientBuilder::credential
//!     → credentials.rs (Credential: master key, resource key,
//!                       resource tokens, token provider)
//!     → signer.rs (x-ms-date + authorization header per attempt)
//! ```
//!
//! # Security Constraints
//! - Keys are decoded once at construction and never logged
//! - `Debug` output of credentials is redacted

pub mod credentials;
pub mod signer;

pub use credentials::{Credential, Permission, TokenProvider, TokenRequest};
pub use signer::AuthSigner;
