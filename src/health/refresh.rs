//! Background location refresh.
//!
//! # Responsibilities
//! - Read the database account at client start and periodically after
//! - Push the published regions into the endpoint manager
//! - Refresh early when a region rejects a request for its role
//!
//! # Design Decisions
//! - The default endpoint is asked first, then the known regions; the first
//!   answer wins
//! - A failed refresh keeps the current lists

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::error::{DocDbError, DocDbResult};
use crate::handler::RequestHandler;
use crate::http::OperationKind;

pub struct LocationRefresher {
    handler: Arc<RequestHandler>,
    interval: Duration,
}

impl LocationRefresher {
    pub fn new(handler: Arc<RequestHandler>, interval: Duration) -> Self {
        Self { handler, interval }
    }

    /// One refresh round. Errors only when no endpoint answered.
    pub async fn refresh_once(&self) -> DocDbResult<()> {
        let endpoints = self.handler.endpoints();

        let mut targets = vec![endpoints.default_endpoint().clone()];
        for url in endpoints.candidates(OperationKind::Read) {
            if !targets.contains(&url) {
                targets.push(url);
            }
        }

        let mut last_error = None;
        for (i, endpoint) in targets.iter().enumerate() {
            match self.handler.read_database_account(endpoint).await {
                Ok(account) => {
                    endpoints.update_locations(&account);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(endpoint_idx = i, endpoint = %endpoint, error = %e, "Account read failed, trying next endpoint");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DocDbError::Config("no endpoint to refresh from".to_string())))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.handler.endpoints().discovery_enabled() {
            tracing::info!("Endpoint discovery disabled, location refresh not started");
            return;
        }

        tracing::info!(interval = ?self.interval, "Location refresher starting");

        let endpoints = self.handler.endpoints().clone();
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_once().await {
                        tracing::warn!(error = %e, "Location refresh failed, keeping current regions");
                    }
                }
                _ = endpoints.refresh_requested() => {
                    if let Err(e) = self.refresh_once().await {
                        tracing::warn!(error = %e, "Early location refresh failed, keeping current regions");
                    }
                    ticker.reset();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Location refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
