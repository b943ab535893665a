use std::sync::Arc;

use blobroute_core::ObjectBackend;

/// One storage endpoint inside the cluster.
#[derive(Clone)]
pub struct ClusterNode {
    /// Stable position in the configured node order.
    pub index: usize,
    /// Client handle performing the actual protocol calls.
    pub backend: Arc<dyn ObjectBackend>,
}

impl ClusterNode {
    pub fn new(index: usize, backend: Arc<dyn ObjectBackend>) -> Self {
        Self { index, backend }
    }
}

/// Per-node health state.
///
/// Written only by the health checker, which replaces the whole map at the
/// end of each cycle; readers take one snapshot per scheduling decision.
#[derive(Debug, Clone)]
pub struct Availability {
    available: Vec<bool>,
}

impl Availability {
    /// Every node starts available.
    pub fn new(node_count: usize) -> Self {
        Self {
            available: vec![true; node_count],
        }
    }

    pub fn is_available(&self, index: usize) -> bool {
        self.available.get(index).copied().unwrap_or(false)
    }

    /// Overwrite the state of every node in one pass.
    pub fn replace(&mut self, states: Vec<bool>) {
        debug_assert_eq!(states.len(), self.available.len());
        self.available = states;
    }

    pub fn set(&mut self, index: usize, available: bool) {
        if let Some(slot) = self.available.get_mut(index) {
            *slot = available;
        }
    }

    pub fn snapshot(&self) -> Vec<bool> {
        self.available.clone()
    }

    pub fn available_count(&self) -> usize {
        self.available.iter().filter(|up| **up).count()
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}
