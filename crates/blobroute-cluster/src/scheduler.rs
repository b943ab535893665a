use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use blobroute_core::SchedulePolicy;

use crate::node::Availability;

/// Picks a node index for single-node operations.
///
/// Never fails: when every node is marked down, the designated primary
/// (index 0) is returned so the caller still gets a protocol-level answer
/// instead of an artificial scheduling error.
pub struct Scheduler {
    policy: SchedulePolicy,
    node_count: usize,
    cursor: AtomicUsize,
    availability: Arc<RwLock<Availability>>,
}

impl Scheduler {
    pub fn new(
        policy: SchedulePolicy,
        node_count: usize,
        availability: Arc<RwLock<Availability>>,
    ) -> Self {
        Self {
            policy,
            node_count,
            cursor: AtomicUsize::new(0),
            availability,
        }
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Choose a node for the next operation.
    pub async fn choose_available(&self) -> usize {
        // One snapshot per decision; the checker replaces the map atomically.
        let availability = self.availability.read().await;

        match self.policy {
            SchedulePolicy::MasterSlave => (0..self.node_count)
                .find(|&index| availability.is_available(index))
                .unwrap_or(0),
            SchedulePolicy::RoundRobin => {
                // The cursor advances on every attempt, also past nodes that
                // get skipped, so healthy nodes keep a uniform share. Bounded
                // to one lap: all nodes down must not loop forever.
                for _ in 0..self.node_count {
                    let index = self.next_index();
                    if availability.is_available(index) {
                        return index;
                    }
                }
                0
            }
        }
    }

    fn next_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.node_count
    }
}
