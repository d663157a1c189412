//! Error types for the cluster session.

use dockyard_core::{EngineId, WorkloadType};
use dockyard_engine::EngineError;
use dockyard_scheduler::SchedulerError;
use thiserror::Error;

/// A result type using `ClusterError`.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur in the cluster session.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No strategy is bound to the workload type.
    #[error("no scheduler registered for workload type {0}")]
    NoScheduler(WorkloadType),

    /// No engine accepted the image or had capacity for it.
    #[error("no eligible engine for image {0}")]
    NoEligibleEngine(String),

    /// A strategy failed while evaluating an engine.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// An engine operation failed.
    #[error("engine {engine_id}: {source}")]
    Engine {
        /// The engine that failed.
        engine_id: EngineId,
        /// The underlying engine error.
        #[source]
        source: EngineError,
    },
}

impl ClusterError {
    /// Wrap an engine error with the ID of the engine it came from.
    #[must_use]
    pub fn engine(engine_id: &EngineId, source: EngineError) -> Self {
        Self::Engine {
            engine_id: engine_id.clone(),
            source,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_retriable(),
            Self::Engine { source, .. } => source.is_retriable(),
            Self::NoScheduler(_) | Self::NoEligibleEngine(_) => false,
        }
    }
}
