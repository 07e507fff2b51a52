//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler, endpoint manager, location refresher produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape, CLI only)
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder on its own
//! - Activity ID flows through every log line of an attempt
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
