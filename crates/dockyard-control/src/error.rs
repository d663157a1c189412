//! Error types for the control plane.
//!
//! This module defines all errors that can occur while managing engines and
//! running workloads.

use dockyard_cluster::ClusterError;
use thiserror::Error;

use crate::parse::ParseError;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in control plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A container ID prefix matched more than one container.
    #[error("container prefix {prefix:?} is ambiguous: {matches} containers match")]
    AmbiguousContainerPrefix {
        /// The prefix that was looked up.
        prefix: String,
        /// Number of matching containers.
        matches: usize,
    },

    /// A run request stopped partway through its instance count.
    #[error("run aborted at instance {iteration} after {started} started: {source}")]
    RunAborted {
        /// One-based index of the failing instance.
        iteration: usize,
        /// Containers started before the failure. They are left running.
        started: usize,
        /// The cluster error that stopped the run.
        #[source]
        source: ClusterError,
    },

    /// Environment or port strings could not be parsed.
    #[error("invalid request: {0}")]
    Parse(#[from] ParseError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] dockyard_store::StoreError),

    /// Cluster session error.
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Filesystem error while preparing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControlError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retriable(),
            Self::Cluster(e) | Self::RunAborted { source: e, .. } => e.is_retriable(),
            Self::AmbiguousContainerPrefix { .. } | Self::Parse(_) | Self::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::WorkloadType;

    #[test]
    fn retriable_errors() {
        assert!(ControlError::Store(dockyard_store::StoreError::Database("busy".into()))
            .is_retriable());
        assert!(!ControlError::Store(dockyard_store::StoreError::AlreadyExists("e1".into()))
            .is_retriable());
        assert!(!ControlError::Parse(ParseError::Environment("A".into())).is_retriable());
        assert!(!ControlError::Cluster(ClusterError::NoScheduler(WorkloadType::Host))
            .is_retriable());
        assert!(!ControlError::AmbiguousContainerPrefix {
            prefix: "ab".into(),
            matches: 2
        }
        .is_retriable());
    }

    #[test]
    fn run_aborted_message() {
        let err = ControlError::RunAborted {
            iteration: 2,
            started: 1,
            source: ClusterError::NoEligibleEngine("redis".into()),
        };
        assert_eq!(
            err.to_string(),
            "run aborted at instance 2 after 1 started: no eligible engine for image redis"
        );
    }
}
