use thiserror::Error;

use crate::network::NodeId;

/// Convenient result alias for the gondola library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// Expected outcomes such as "no route" or "no gondola available" are not
/// errors; they are reported through [`crate::RouteOutcome::NoRoute`] and
/// [`crate::Assignment::Unavailable`].
#[derive(Debug, Error)]
pub enum Error {
    /// A search or lookup referenced a node id absent from the network.
    #[error("unknown node {id}")]
    UnknownNode { id: NodeId },

    /// Weight requested for two distinct nodes that are not adjacent.
    #[error("nodes {from} and {to} are not connected")]
    InvalidEdge { from: NodeId, to: NodeId },

    /// Parent links did not lead back to a search root.
    #[error("broken parent chain while reconstructing path to {goal}")]
    BrokenChain { goal: NodeId },

    /// Nearest-station resolution on a network without stations.
    #[error("network has no stations")]
    EmptyNetwork,

    /// `pull` was called on an empty frontier.
    #[error("priority frontier is empty")]
    EmptyFrontier,

    /// Node set and adjacency matrix do not describe a valid network.
    #[error("invalid network topology: {message}")]
    InvalidTopology { message: String },

    /// Every commit attempt lost its candidate to a concurrent dispatch.
    #[error("dispatch for station {station} abandoned after {attempts} contended commits")]
    DispatchContention { station: NodeId, attempts: u32 },

    /// The caller withdrew a pending dispatch request.
    #[error("dispatch request for station {station} was cancelled")]
    Cancelled { station: NodeId },

    /// Failure reported by a fleet repository implementation.
    #[error("persistence failure: {message}")]
    Persistence { message: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the fleet database")]
    ProjectDirsUnavailable,

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn topology(message: impl Into<String>) -> Self {
        Error::InvalidTopology {
            message: message.into(),
        }
    }

    pub(crate) fn persistence(message: impl Into<String>) -> Self {
        Error::Persistence {
            message: message.into(),
        }
    }

    /// Whether the error came from the persistence collaborator and may
    /// succeed when retried.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. } | Error::Sqlite(_))
    }
}
