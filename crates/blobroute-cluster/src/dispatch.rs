use std::sync::Arc;

use futures::future::{self, BoxFuture};

use blobroute_core::{BackendResult, ClusterError, ClusterResult, ObjectBackend};

use crate::node::ClusterNode;
use crate::scheduler::Scheduler;

/// Executes operations against the node set.
///
/// Reads go to one scheduled node and fail over across the rest; writes fan
/// out to every node and must be accepted by all of them. Both paths are
/// shared by every named operation on the client, which only supplies the
/// backend call as a closure.
pub struct Dispatcher {
    nodes: Arc<Vec<ClusterNode>>,
    scheduler: Scheduler,
}

impl Dispatcher {
    pub fn new(nodes: Arc<Vec<ClusterNode>>, scheduler: Scheduler) -> Self {
        Self { nodes, scheduler }
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Single-node read with cross-node failover.
    ///
    /// Terminal failures (status 200-499) are authoritative answers and
    /// propagate immediately. Transport failures walk the remaining nodes in
    /// configured order, one node at a time; retrying sequentially avoids
    /// piling load onto a cluster that is already struggling.
    pub async fn read<T, F>(&self, op: F) -> ClusterResult<T>
    where
        F: Fn(Arc<dyn ObjectBackend>) -> BoxFuture<'static, BackendResult<T>>,
    {
        let primary = self.scheduler.choose_available().await;

        let mut last = match op(self.nodes[primary].backend.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_terminal() => return Err(ClusterError::Backend(err)),
            Err(err) => err,
        };

        for node in self.nodes.iter() {
            if node.index == primary {
                continue;
            }
            match op(node.backend.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_terminal() => return Err(ClusterError::Backend(err)),
                Err(err) => last = err,
            }
        }

        Err(ClusterError::AllNodesDown { last })
    }

    /// Fan-out write: every node must accept the operation.
    ///
    /// The operation is issued to all nodes concurrently, marked down ones
    /// included, and every invocation is awaited to completion before the
    /// outcome is decided, so a failed fan-out leaves no write still in
    /// flight. The first failure in node order fails the whole operation;
    /// on success the result from node 0 is returned and the structurally
    /// identical results of the other nodes are discarded.
    pub async fn write<T, F>(&self, op: F) -> ClusterResult<T>
    where
        F: Fn(Arc<dyn ObjectBackend>) -> BoxFuture<'static, BackendResult<T>>,
    {
        let pending: Vec<_> = self
            .nodes
            .iter()
            .map(|node| op(node.backend.clone()))
            .collect();

        let mut first = None;
        for result in future::join_all(pending).await {
            let value = result.map_err(ClusterError::Backend)?;
            if first.is_none() {
                first = Some(value);
            }
        }

        first.ok_or_else(|| ClusterError::Config("cluster has no nodes".to_string()))
    }
}
