//! Endpoint health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Location refresh (refresh.rs):
//!     Client start + periodic timer
//!     → GET database account
//!     → endpoint_manager.update_locations()
//!
//! Passive marking (endpoint_manager.rs):
//!     Retry policy sees an endpoint failure
//!     → mark_unavailable(url)
//!     Request handler sees a success
//!     → mark_available(url)
//!
//! State machine (state.rs):
//!     Unknown → Live ←→ Unavailable(since)
//!     With a cooldown before an unavailable endpoint is tried again
//! ```
//!
//! # Design Decisions
//! - Region lists live in one immutable snapshot swapped atomically
//! - Health state is per-endpoint URL, shared by the read and write lists
//! - Nothing here returns an error; the default endpoint is the last resort

pub mod endpoint_manager;
pub mod refresh;
pub mod state;

pub use endpoint_manager::{AccountLocation, DatabaseAccount, GlobalEndpointManager, LocationSnapshot};
pub use refresh::LocationRefresher;
pub use state::{EndpointRecord, EndpointRole, EndpointState};
