//! Error types for engine communication.

use thiserror::Error;

/// A result type using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while talking to a container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine address cannot be used by this client.
    #[error("unsupported engine address: {0}")]
    UnsupportedAddress(String),

    /// The HTTP client could not be built.
    #[error("failed to build engine client: {0}")]
    ClientBuild(String),

    /// The request did not reach the engine or the connection failed.
    #[error("engine request failed: {0}")]
    Request(String),

    /// The engine answered with an error status.
    #[error("engine API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the engine.
        message: String,
    },

    /// Pulling an image failed.
    #[error("image pull failed for {image}: {message}")]
    Pull {
        /// The image being pulled.
        image: String,
        /// Error message reported by the engine.
        message: String,
    },

    /// The engine response could not be understood.
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors() {
        assert!(EngineError::Request("connection refused".to_string()).is_retriable());
        assert!(EngineError::Api {
            status: 503,
            message: "busy".to_string()
        }
        .is_retriable());
        assert!(!EngineError::Api {
            status: 404,
            message: "no such image".to_string()
        }
        .is_retriable());
        assert!(!EngineError::UnsupportedAddress("unix:///var/run/docker.sock".to_string())
            .is_retriable());
    }
}
