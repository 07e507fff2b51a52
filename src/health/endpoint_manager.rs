//! Regional endpoint selection.
//!
//! # Responsibilities
//! - Hold the account's write and read regions in preference order
//! - Resolve the endpoint for the next attempt of a read or a write
//! - Track which endpoints are unavailable and for how long
//! - Let the retry path ask the location refresher for an early refresh
//!
//! # Design Decisions
//! - The snapshot is replaced, never edited in place (`ArcSwap::rcu`), so a
//!   concurrent reader sees either the old or the new lists
//! - Unavailable endpoints stay in the candidate list, ordered after the
//!   live ones by failure time; the least recently failed goes first

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

use crate::config::ConnectionPolicy;
use crate::health::state::{EndpointRecord, EndpointRole, EndpointState};
use crate::http::OperationKind;
use crate::observability::metrics;

/// The subset of the database account resource used for routing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAccount {
    #[serde(default)]
    pub writable_locations: Vec<AccountLocation>,
    #[serde(default)]
    pub readable_locations: Vec<AccountLocation>,
    #[serde(default)]
    pub enable_multiple_write_locations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLocation {
    pub name: String,
    pub database_account_endpoint: String,
}

/// Region lists at one point in time, in account order.
#[derive(Debug, Clone, Default)]
pub struct LocationSnapshot {
    pub write: Vec<EndpointRecord>,
    pub read: Vec<EndpointRecord>,
    pub multiple_write_enabled: bool,
}

/// Shared by every in-flight call of a client.
#[derive(Debug)]
pub struct GlobalEndpointManager {
    default_endpoint: Url,
    preferred_locations: Vec<String>,
    enable_endpoint_discovery: bool,
    use_multiple_write_locations: bool,
    cooldown: Duration,
    snapshot: ArcSwap<LocationSnapshot>,
    refresh: Notify,
}

impl GlobalEndpointManager {
    pub fn new(default_endpoint: Url, policy: &ConnectionPolicy) -> Self {
        Self {
            default_endpoint,
            preferred_locations: policy.preferred_locations.clone(),
            enable_endpoint_discovery: policy.enable_endpoint_discovery,
            use_multiple_write_locations: policy.use_multiple_write_locations,
            cooldown: policy.unavailable_endpoint_cooldown(),
            snapshot: ArcSwap::from_pointee(LocationSnapshot::default()),
            refresh: Notify::new(),
        }
    }

    pub fn default_endpoint(&self) -> &Url {
        &self.default_endpoint
    }

    pub fn discovery_enabled(&self) -> bool {
        self.enable_endpoint_discovery
    }

    /// Writes may go to any write region, not just the first.
    pub fn multiple_write_enabled(&self) -> bool {
        self.use_multiple_write_locations && self.snapshot.load().multiple_write_enabled
    }

    pub fn snapshot(&self) -> Arc<LocationSnapshot> {
        self.snapshot.load_full()
    }

    /// Endpoint for the next attempt of an operation of this kind.
    pub fn resolve_endpoint(&self, kind: OperationKind) -> Url {
        self.candidates(kind)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.default_endpoint.clone())
    }

    /// Distinct endpoints in the order they should be tried: live ones in
    /// preference order, then unavailable ones by failure time.
    pub fn candidates(&self, kind: OperationKind) -> Vec<Url> {
        if !self.enable_endpoint_discovery {
            return vec![self.default_endpoint.clone()];
        }

        let snapshot = self.snapshot.load();
        let records: Vec<&EndpointRecord> = match kind {
            OperationKind::Write if self.multiple_write_enabled() => self.by_preference(&snapshot.write),
            OperationKind::Write => snapshot.write.iter().collect(),
            OperationKind::Read if snapshot.read.is_empty() => self.by_preference(&snapshot.write),
            OperationKind::Read => self.by_preference(&snapshot.read),
        };

        if records.is_empty() {
            return vec![self.default_endpoint.clone()];
        }

        let now = Instant::now();
        let (mut live, mut down): (Vec<&EndpointRecord>, Vec<&EndpointRecord>) = records
            .into_iter()
            .partition(|r| r.is_available(now, self.cooldown));
        down.sort_by_key(|r| r.unavailable_since);
        live.append(&mut down);

        let mut seen = HashSet::new();
        live.into_iter()
            .filter(|r| seen.insert(r.url.clone()))
            .map(|r| r.url.clone())
            .collect()
    }

    /// Preferred regions first in configured order, then the rest in
    /// account order.
    fn by_preference<'a>(&self, records: &'a [EndpointRecord]) -> Vec<&'a EndpointRecord> {
        let mut ordered: Vec<&EndpointRecord> = self
            .preferred_locations
            .iter()
            .filter_map(|name| records.iter().find(|r| r.location.eq_ignore_ascii_case(name)))
            .collect();
        for record in records {
            if !ordered.iter().any(|r| r.url == record.url) {
                ordered.push(record);
            }
        }
        ordered
    }

    /// Mark every record with this URL unavailable as of `at`. Repeated
    /// calls refresh the timestamp.
    pub fn mark_unavailable(&self, url: &Url, at: Instant) {
        let mut matched = false;
        self.snapshot.rcu(|current| {
            let mut next = LocationSnapshot::clone(current);
            matched = false;
            for record in next.write.iter_mut().chain(next.read.iter_mut()) {
                if &record.url == url {
                    record.unavailable_since = Some(at);
                    matched = true;
                }
            }
            next
        });

        if matched {
            tracing::warn!(endpoint = %url, cooldown = ?self.cooldown, "Endpoint marked unavailable");
            metrics::record_endpoint_unavailable(url);
        } else {
            tracing::debug!(endpoint = %url, "Endpoint not in region lists, nothing to mark");
        }
    }

    /// Record a successful attempt. No-op when the endpoint is already live.
    pub fn mark_available(&self, url: &Url) {
        let needs_update = {
            let snapshot = self.snapshot.load();
            snapshot
                .write
                .iter()
                .chain(snapshot.read.iter())
                .any(|r| &r.url == url && (r.unavailable_since.is_some() || !r.verified))
        };
        if !needs_update {
            return;
        }

        let mut recovered = false;
        self.snapshot.rcu(|current| {
            let mut next = LocationSnapshot::clone(current);
            recovered = false;
            for record in next.write.iter_mut().chain(next.read.iter_mut()) {
                if &record.url == url {
                    recovered |= record.unavailable_since.take().is_some();
                    record.verified = true;
                }
            }
            next
        });

        if recovered {
            tracing::info!(endpoint = %url, "Endpoint available again");
        }
    }

    /// Ask for a location refresh ahead of the next tick. Requests made
    /// while nobody waits are kept until the refresher looks.
    pub fn request_refresh(&self) {
        if self.enable_endpoint_discovery {
            tracing::info!("Early location refresh requested");
            self.refresh.notify_one();
        }
    }

    /// Completes once a refresh has been requested.
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await
    }

    pub fn is_unavailable(&self, url: &Url) -> bool {
        matches!(self.state_of(url), Some(EndpointState::Unavailable { .. }))
    }

    /// State of the endpoint, `None` when it is in neither list.
    pub fn state_of(&self, url: &Url) -> Option<EndpointState> {
        let now = Instant::now();
        let snapshot = self.snapshot.load();
        snapshot
            .write
            .iter()
            .chain(snapshot.read.iter())
            .find(|r| &r.url == url)
            .map(|r| r.state(now, self.cooldown))
    }

    /// Replace the region lists from a freshly read account. Marks on URLs
    /// that are still published carry over.
    pub fn update_locations(&self, account: &DatabaseAccount) {
        let write = to_records(&account.writable_locations, EndpointRole::Write);
        let read = to_records(&account.readable_locations, EndpointRole::Read);

        self.snapshot.rcu(|current| {
            let carry = |mut record: EndpointRecord| {
                if let Some(old) = current
                    .write
                    .iter()
                    .chain(current.read.iter())
                    .find(|r| r.url == record.url)
                {
                    record.unavailable_since = old.unavailable_since;
                    record.verified = old.verified;
                }
                record
            };
            LocationSnapshot {
                write: write.iter().cloned().map(&carry).collect(),
                read: read.iter().cloned().map(&carry).collect(),
                multiple_write_enabled: account.enable_multiple_write_locations,
            }
        });

        tracing::info!(
            write_regions = account.writable_locations.len(),
            read_regions = account.readable_locations.len(),
            multiple_write = account.enable_multiple_write_locations,
            "Region lists updated"
        );
    }
}

fn to_records(locations: &[AccountLocation], role: EndpointRole) -> Vec<EndpointRecord> {
    locations
        .iter()
        .filter_map(|location| match Url::parse(&location.database_account_endpoint) {
            Ok(url) => Some(EndpointRecord::new(location.name.clone(), url, role)),
            Err(e) => {
                tracing::warn!(
                    location = %location.name,
                    endpoint = %location.database_account_endpoint,
                    error = %e,
                    "Ignoring region with invalid endpoint"
                );
                None
            }
        })
        .collect()
}
