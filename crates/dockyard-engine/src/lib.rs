//! Container engine clients for dockyard.
//!
//! This crate talks to individual container engines over the Docker Engine
//! API. It provides:
//!
//! - **Client interface**: the [`EngineClient`] trait and the [`Engine`] handle
//! - **HTTP client**: [`HttpEngineClient`] for plain and TLS transports
//! - **TLS**: [`tls::client_config`] builds a mutual-TLS client configuration
//!   from PEM material
//! - **Connectors**: [`Connector`] turns stored engine specs into handles
//!
//! # Testing
//!
//! For testing without a container runtime, enable the `test-utils` feature
//! and use the mock connector:
//!
//! ```ignore
//! use dockyard_engine::{Connector, MockConnector};
//!
//! let connector = MockConnector::new();
//! let engine = connector.connect(&spec, None)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod connector;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod tls;

pub use client::{ContainerSummary, Engine, EngineClient, EngineInfo, Transport};
pub use connector::{Connector, HttpConnector};
pub use error::{EngineError, Result};
pub use http::HttpEngineClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockConnector, MockEngineClient};
pub use tls::TlsError;
