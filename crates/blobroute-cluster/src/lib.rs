pub mod cluster;
pub mod dispatch;
pub mod events;
pub mod health_checker;
pub mod node;
pub mod scheduler;

pub use cluster::ClusterClient;
pub use dispatch::Dispatcher;
pub use events::{ClusterEvent, EventBus};
pub use health_checker::{default_probe_key, HealthChecker};
pub use node::{Availability, ClusterNode};
pub use scheduler::Scheduler;
