//! Client-side request pipeline for a multi-region document database.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller (CRUD / query layers)
//!        │  execute(verb, resource_type, resource_id, path, body, options, abort)
//!        ▼
//!  ┌──────────────────────────────────────────────────────────────────┐
//!  │                        RequestHandler                             │
//!  │                                                                    │
//!  │  ┌──────────────┐   ┌──────────────────────┐   ┌──────────────┐   │
//!  │  │  auth signer │   │ GlobalEndpointManager│   │   session    │   │
//!  │  │ (x-ms-date,  │   │  (region lists, live │   │  container   │   │
//!  │  │ authorization)│  │   / unavailable)     │   │              │   │
//!  │  └──────┬───────┘   └──────────┬───────────┘   └──────┬───────┘   │
//!  │         └──────────────┬───────┘                      │           │
//!  │                        ▼                              │           │
//!  │                 ┌─────────────┐   error   ┌───────────▼────────┐  │
//!  │                 │  transport  │──────────▶│    RetryPolicy     │  │
//!  │                 │ deadline +  │           │ throttle/failover/ │  │
//!  │                 │ user cancel │◀──────────│   session retry    │  │
//!  │                 └─────────────┘   retry   └────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   ResponseEnvelope  |  DocDbError
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod options;
pub mod resilience;
pub mod session;

pub use client::{ClientBuilder, DocumentClient};
pub use config::ClientConfig;
pub use error::{DocDbError, DocDbResult};
pub use handler::RequestHandler;
pub use http::{ErrorEnvelope, Headers, HttpVerb, ResourceType, ResponseEnvelope};
pub use options::RequestOptions;
pub use tokio_util::sync::CancellationToken;
