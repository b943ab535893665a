use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use blobroute_core::{ClusterResult, HeadOptions, PutOptions};

use crate::dispatch::Dispatcher;
use crate::events::{ClusterEvent, EventBus};
use crate::node::{Availability, ClusterNode};

/// Key prefix for the health probe object.
const PROBE_PREFIX: &str = ".blobroute";

/// Derive the process-wide probe key from the local IP address.
///
/// Every health check of this process heads the same object, so concurrent
/// clients on one host share a single probe file per cluster.
pub fn default_probe_key() -> String {
    let ip = local_ip_address::local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string());
    format!("{}/check.status.{}.txt", PROBE_PREFIX, ip)
}

/// Periodic availability probe over every node.
///
/// Each cycle heads the probe object directly on each node (bypassing the
/// scheduler) and rewrites the availability map in one pass. A node gets up
/// to three attempts before it is marked down; any protocol-level answer,
/// 404 included, counts as healthy.
pub struct HealthChecker {
    nodes: Arc<Vec<ClusterNode>>,
    availability: Arc<RwLock<Availability>>,
    dispatcher: Arc<Dispatcher>,
    events: Arc<EventBus>,
    probe_key: String,
    attempts: u32,
    in_progress: AtomicBool,
}

impl HealthChecker {
    pub fn new(
        nodes: Arc<Vec<ClusterNode>>,
        availability: Arc<RwLock<Availability>>,
        dispatcher: Arc<Dispatcher>,
        events: Arc<EventBus>,
        attempts: u32,
    ) -> Self {
        Self {
            nodes,
            availability,
            dispatcher,
            events,
            probe_key: default_probe_key(),
            attempts,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn probe_key(&self) -> &str {
        &self.probe_key
    }

    /// Run one availability cycle.
    ///
    /// On the first run the probe object is written through the regular
    /// write path first, which fans out to every node and proves the cluster
    /// accepts writes; a failure there aborts the cycle and is surfaced by
    /// the caller on the error signal path. Overlapping cycles are no-ops.
    pub async fn check_availability(&self, first_run: bool) -> ClusterResult<()> {
        if first_run {
            let payload = Bytes::from(format!(
                "availability check started at {}",
                chrono::Utc::now().to_rfc3339()
            ));
            let key = self.probe_key.clone();
            self.dispatcher
                .write(move |backend| {
                    let key = key.clone();
                    let payload = payload.clone();
                    Box::pin(
                        async move { backend.put(&key, payload, &PutOptions::default()).await },
                    )
                })
                .await?;
        }

        if self.in_progress.swap(true, Ordering::AcqRel) {
            // The timer fired into a cycle that is still running.
            return Ok(());
        }

        let mut states = Vec::with_capacity(self.nodes.len());
        let mut down_urls = Vec::new();
        for node in self.nodes.iter() {
            let available = self.probe_node(node).await;
            if !available {
                down_urls.push(node.backend.object_url(&self.probe_key));
            }
            states.push(available);
        }

        self.availability.write().await.replace(states);
        self.in_progress.store(false, Ordering::Release);

        if !down_urls.is_empty() {
            warn!(
                "{} data node down, please check status file: {}",
                down_urls.len(),
                down_urls.join(", ")
            );
            self.events.emit(ClusterEvent::AvailabilityCheckFailed {
                down_count: down_urls.len(),
                status_urls: down_urls,
            });
        }

        Ok(())
    }

    /// Probe one node, retrying up to the configured number of attempts.
    async fn probe_node(&self, node: &ClusterNode) -> bool {
        for attempt in 0..self.attempts {
            if self.probe_once(node).await {
                return true;
            }
            debug!(node = node.index, attempt, "availability probe failed");
        }
        false
    }

    /// One `head` against the probe object, directly on the node.
    ///
    /// Any protocol-level answer counts as healthy, 404 included: the node
    /// spoke the protocol correctly, it just does not hold the object.
    async fn probe_once(&self, node: &ClusterNode) -> bool {
        match node
            .backend
            .head(&self.probe_key, &HeadOptions::default())
            .await
        {
            Ok(_) => true,
            Err(err) => err.is_terminal(),
        }
    }
}
