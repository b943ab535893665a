//! blobroute core types and backend contract
//!
//! This crate provides the shared types for the blobroute cluster client:
//! the operation contract a storage endpoint must expose, the data model of
//! its results, the error taxonomy, and the cluster configuration surface.
//!
//! # Overview
//!
//! blobroute fronts N independent object-storage endpoints with one logical
//! handle. The actual wire protocol (request signing, response parsing,
//! body streaming) lives behind the [`ObjectBackend`] trait and is supplied
//! by the embedding application; this crate only defines that surface:
//!
//! - **Backend contract**: [`ObjectBackend`] with one method per object
//!   operation, all failing with a [`BackendError`]
//! - **Data model**: metadata, buffered and streamed bodies, list pages,
//!   write receipts
//! - **Errors**: per-backend errors with a status-based retry
//!   classification, and the cluster-level error enum
//! - **Configuration**: endpoint list, scheduling policy, heartbeat settings
//!
//! # Example
//!
//! ```no_run
//! use blobroute_core::{BackendError, ClusterConfig, SchedulePolicy};
//!
//! let config = ClusterConfig {
//!     schedule: SchedulePolicy::MasterSlave,
//!     ..ClusterConfig::default()
//! };
//!
//! let err = BackendError::with_status(404, "object not found");
//! assert!(err.is_terminal());
//! assert_eq!(config.probe_attempts, 3);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::ObjectBackend;
pub use config::{ClusterConfig, EndpointConfig, SchedulePolicy};
pub use error::{BackendError, BackendResult, ClusterError, ClusterResult};
pub use types::{
    ByteStream, DeleteMultiOptions, GetOptions, HeadOptions, ListOptions, ListPage, ObjectContent,
    ObjectMeta, ObjectSummary, PutOptions, Receipt, SignatureOptions,
};
