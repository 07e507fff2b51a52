//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! RequestOptions
//!     → headers.rs (options → wire headers, case-insensitive map)
//!     → request.rs (verb, resource type, RequestContext)
//!     → transport.rs (one exchange: deadline + caller cancellation)
//!     → response.rs (status classification → ResponseEnvelope | ErrorEnvelope)
//! ```
//!
//! # Design Decisions
//! - The raw exchange sits behind the `HttpClient` trait; reqwest is the
//!   production implementation
//! - Status >= 400 never comes back as a success
//! - Response headers are copied into a plain map before the response is dropped

pub mod headers;
pub mod request;
pub mod response;
pub mod transport;

pub use headers::Headers;
pub use request::{HttpVerb, OperationKind, RequestContext, ResourceType};
pub use response::{ErrorEnvelope, ResponseEnvelope};
pub use transport::{HttpClient, RawResponse, ReqwestClient, Transport, WireRequest};
