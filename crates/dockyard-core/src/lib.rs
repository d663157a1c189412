//! Core types and utilities for dockyard.
//!
//! This crate provides the foundational types used throughout the dockyard
//! control plane:
//!
//! - **Identifiers**: validated engine and container IDs
//! - **Domain types**: engine specs, image specs, containers, cluster snapshots
//! - **Events**: lifecycle records emitted by the cluster session
//!
//! # Example
//!
//! ```
//! use dockyard_core::{EngineId, ImageSpec, WorkloadType};
//!
//! let engine_id: EngineId = "engine-01".parse().unwrap();
//!
//! let mut image = ImageSpec::new("nginx:latest");
//! image.workload_type = "unique".parse::<WorkloadType>().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod ids;
pub mod types;

pub use error::{CoreError, Result};
pub use event::{Event, EventKind};
pub use ids::{ContainerId, EngineId, IdError};
pub use types::{
    ClusterInfo, Container, ContainerState, EngineSpec, ImageSpec, PortBinding,
    UnknownWorkloadType, WorkloadType,
};
