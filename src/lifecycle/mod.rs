//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (client.rs):
//!     Validate config → Build signer, tracker, transport → Initial location
//!     refresh → Spawn background refresher
//!
//! Shutdown (shutdown.rs):
//!     Client dropped → Trigger broadcast → Background tasks exit their loops
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then background tasks
//! - Background tasks never outlive the client that spawned them

pub mod shutdown;

pub use shutdown::Shutdown;
