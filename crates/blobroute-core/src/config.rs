//! Cluster configuration surface.

use std::time::Duration;

/// How the scheduler picks a node for read operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Cycle through nodes in order, skipping unavailable ones.
    #[default]
    RoundRobin,
    /// Always prefer the lowest-indexed available node.
    MasterSlave,
}

/// Configuration for one backend endpoint.
///
/// The router does not interpret `endpoint` itself; it is handed to the
/// backend factory as-is.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Endpoint URL or address understood by the backend factory.
    pub endpoint: String,
    /// Per-request timeout; falls back to the cluster-wide value.
    pub timeout: Option<Duration>,
    /// Connect timeout; falls back to the cluster-wide value.
    pub connect_timeout: Option<Duration>,
}

impl EndpointConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: None,
            connect_timeout: None,
        }
    }
}

/// Cluster-wide options.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub schedule: SchedulePolicy,
    /// Interval between availability checks.
    pub heartbeat_interval: Duration,
    /// Probe attempts per node before it is marked down.
    pub probe_attempts: u32,
    /// Default per-request timeout applied to every endpoint.
    pub timeout: Option<Duration>,
    /// Default connect timeout applied to every endpoint.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            schedule: SchedulePolicy::default(),
            heartbeat_interval: Duration::from_millis(10_000),
            probe_attempts: 3,
            timeout: None,
            connect_timeout: None,
        }
    }
}

impl ClusterConfig {
    /// Fill endpoint-level gaps with the cluster-wide defaults.
    pub fn apply_defaults(&self, endpoint: &mut EndpointConfig) {
        if endpoint.timeout.is_none() {
            endpoint.timeout = self.timeout;
        }
        if endpoint.connect_timeout.is_none() {
            endpoint.connect_timeout = self.connect_timeout;
        }
    }
}
