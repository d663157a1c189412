//! Placement strategies for dockyard.
//!
//! This crate decides which engine hosts a workload. It provides:
//!
//! - The [`Scheduler`] trait, a per-engine acceptance predicate
//! - Strategies: [`LabelScheduler`], [`UniqueScheduler`], [`HostScheduler`]
//!   and the composite [`MultiScheduler`]
//! - The [`SchedulerRegistry`], binding each workload type to a strategy
//! - The [`ResourceManager`], choosing among accepted engines by capacity
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                Cluster session               │
//! └──────────────────────────────────────────────┘
//!                       │ workload type
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │              SchedulerRegistry               │
//! │  service → label      unique → unique        │
//! │  host    → host       multi  → label+unique  │
//! └──────────────────────────────────────────────┘
//!                       │ accepted engines
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │               ResourceManager                │
//! │   capacity check, fewest containers wins     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dockyard_core::{ImageSpec, WorkloadType};
//! use dockyard_scheduler::{ResourceManager, SchedulerRegistry};
//!
//! let registry = SchedulerRegistry::with_defaults();
//! let scheduler = registry.get(WorkloadType::Service).unwrap();
//!
//! let image = ImageSpec::new("nginx:latest");
//! let mut accepted = Vec::new();
//! for engine in &engines {
//!     if scheduler.schedule(&image, engine).await? {
//!         accepted.push(engine.clone());
//!     }
//! }
//! let chosen = ResourceManager::new().place(&image, &accepted).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod registry;
pub mod resources;
pub mod strategy;

pub use error::{Result, SchedulerError};
pub use registry::SchedulerRegistry;
pub use resources::{Reservation, ResourceManager};
pub use strategy::{
    HostScheduler, LabelScheduler, MultiScheduler, Scheduler, UniqueScheduler, HOST_LABEL_PREFIX,
};
