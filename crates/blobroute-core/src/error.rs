use thiserror::Error;

/// Error carried by a single backend operation.
///
/// `status` is the protocol status code when the endpoint produced an
/// authoritative answer; transport failures (refused connections, timeouts,
/// truncated responses) carry no status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    /// Protocol status code, absent for transport-level failures.
    pub status: Option<u16>,
    /// Human-readable description from the backend.
    pub message: String,
}

impl BackendError {
    /// Failure with an authoritative protocol status.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Transport-level failure with no protocol status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error is an authoritative protocol answer.
    ///
    /// Statuses in `200..500` (not-found, precondition-failed, ...) mean the
    /// node answered the protocol correctly and must never be retried on
    /// another node. Anything else signals a node outage.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Some(s) if s >= 200 && s < 500)
    }

    /// Inverse of [`is_terminal`](Self::is_terminal): the failure may
    /// succeed against a different node.
    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }
}

/// Errors surfaced by the cluster client.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Authoritative backend answer (status 200-499) on a read, or any
    /// failed invocation of a fan-out write, surfaced verbatim.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A read was attempted on every node and all failed at transport level.
    #[error("{} (all clients are down)", .last.message)]
    AllNodesDown {
        /// The last transport error encountered while walking the nodes.
        last: BackendError,
    },

    /// The endpoint list was missing or empty at construction.
    #[error("invalid cluster configuration: {0}")]
    Config(String),

    /// The client has been closed.
    #[error("cluster client is closed")]
    Closed,
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;
