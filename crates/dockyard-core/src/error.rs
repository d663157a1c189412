//! Common error types for dockyard.
//!
//! This module provides shared error types that are used across multiple crates.

use crate::ids::EngineId;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the dockyard system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An engine with the specified ID was not found.
    #[error("engine not found: {0}")]
    EngineNotFound(EngineId),
}
