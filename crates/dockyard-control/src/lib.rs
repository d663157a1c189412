//! Control plane for dockyard.
//!
//! This crate ties the pieces together: it keeps the registry of engines,
//! builds the cluster session from it, runs workloads and persists the
//! lifecycle events the session emits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         CLI (dockyard)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Manager                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Engine    │ │    Run      │ │    Event            │    │
//! │  │   Registry  │ │    Pipeline │ │    Capture          │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Store   │   │ Cluster  │   │ Engines  │
//!        │ (RocksDB)│   │ session  │   │ (HTTP)   │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use dockyard_control::{Manager, ManagerConfig, RunRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = Manager::open(ManagerConfig::with_data_dir("/tmp/dockyard")).await?;
//!
//! let mut request = RunRequest::new("redis:7");
//! request.count = 2;
//! request.environment = vec!["MODE=cache".to_string()];
//! request.ports = vec!["tcp/:6379".to_string()];
//!
//! for container in manager.run(&request).await? {
//!     println!("started {} on {}", container.id.short(), container.engine.id);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod capture;
pub mod error;
pub mod manager;
pub mod parse;
pub mod run;
pub mod types;

pub use capture::EventCapture;
pub use error::{ControlError, Result};
pub use manager::Manager;
pub use parse::{parse_environment, parse_ports, ParseError};
pub use types::{ManagerConfig, RunRequest};
