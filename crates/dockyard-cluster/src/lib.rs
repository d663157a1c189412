//! Cluster session for dockyard.
//!
//! A [`Cluster`] holds the connected engines and the scheduler bindings. It
//! places workloads, lists live containers, reports cluster-wide capacity and
//! publishes lifecycle events on an [`EventBus`].
//!
//! Sessions are rebuilt, never patched: when the engine set changes the
//! owner builds a new `Cluster` and hands it the same `EventBus`, so event
//! subscribers are unaffected by the swap.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dockyard_cluster::{Cluster, EventBus};
//! use dockyard_core::ImageSpec;
//! use dockyard_scheduler::SchedulerRegistry;
//!
//! let bus = EventBus::default();
//! let cluster = Cluster::new(engines, Arc::new(SchedulerRegistry::with_defaults()), bus.clone());
//!
//! let container = cluster.run(&ImageSpec::new("nginx:latest"), true).await?;
//! println!("started {} on {}", container.id.short(), container.engine.id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cluster;
pub mod error;
pub mod events;

pub use cluster::Cluster;
pub use error::{ClusterError, Result};
pub use events::EventBus;
