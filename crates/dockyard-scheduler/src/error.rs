//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// An engine could not be queried while evaluating it.
    #[error("Engine error: {0}")]
    Engine(#[from] dockyard_engine::EngineError),
}

impl SchedulerError {
    /// Check if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_retriable(),
        }
    }
}

/// A specialized Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
