//! Shared domain types: engines, workload images, containers and cluster
//! snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, EngineId};

/// Classification of a workload, selecting which scheduler binding places it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadType {
    /// Long-running service placed by label matching.
    #[default]
    Service,
    /// At most one container of the image per engine.
    Unique,
    /// Pinned to the engine named by a `host:<engine-id>` label.
    Host,
    /// Label matching combined with the uniqueness constraint.
    Multi,
}

impl WorkloadType {
    /// All workload types, in registration order.
    pub const ALL: [Self; 4] = [Self::Service, Self::Unique, Self::Host, Self::Multi];

    /// Return the canonical name of this workload type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Unique => "unique",
            Self::Host => "host",
            Self::Multi => "multi",
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WorkloadType {
    type Err = UnknownWorkloadType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownWorkloadType(s.to_string()))
    }
}

/// Returned when a string does not name a known workload type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workload type: {0:?}")]
pub struct UnknownWorkloadType(pub String);

/// Identity, address and capacity of a compute engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Unique engine identifier.
    pub id: EngineId,
    /// Network address of the engine API (e.g. `tcp://10.0.0.5:2376`).
    pub addr: String,
    /// CPU capacity. Zero means unlimited.
    #[serde(default)]
    pub cpus: f64,
    /// Memory capacity in megabytes. Zero means unlimited.
    #[serde(default)]
    pub memory_mb: f64,
    /// Labels used by label-matching placement.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl EngineSpec {
    /// Create an engine spec with unlimited capacity and no labels.
    #[must_use]
    pub fn new(id: EngineId, addr: impl Into<String>) -> Self {
        Self {
            id,
            addr: addr.into(),
            cpus: 0.0,
            memory_mb: 0.0,
            labels: Vec::new(),
        }
    }

    /// Check whether the engine carries the given label.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A port exposed by a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Protocol tag, e.g. `tcp` or `udp`.
    pub proto: String,
    /// Host port. Zero lets the engine assign one.
    pub host_port: u16,
    /// Container port. Zero means unspecified.
    pub container_port: u16,
}

/// Complete description of a container to be started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Image name, e.g. `nginx:latest`.
    pub name: String,
    /// CPU share, fractional.
    pub cpus: f64,
    /// Memory limit in megabytes.
    pub memory_mb: f64,
    /// Container hostname.
    #[serde(default)]
    pub hostname: String,
    /// Container domain name.
    #[serde(default)]
    pub domainname: String,
    /// Placement labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Arguments passed to the container command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<PortBinding>,
    /// Workload type selecting the scheduler binding.
    #[serde(default)]
    pub workload_type: WorkloadType,
}

impl ImageSpec {
    /// Create an image spec with the given name and default resources.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpus: 0.1,
            memory_mb: 256.0,
            hostname: String::new(),
            domainname: String::new(),
            labels: Vec::new(),
            args: Vec::new(),
            environment: BTreeMap::new(),
            ports: Vec::new(),
            workload_type: WorkloadType::Service,
        }
    }
}

/// Runtime state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// Created but not started.
    Created,
    /// Running.
    Running,
    /// Paused.
    Paused,
    /// Exited or dead.
    Exited,
    /// State cannot be determined.
    #[default]
    Unknown,
}

impl ContainerState {
    /// Parse a container state from a Docker state string.
    #[must_use]
    pub fn from_docker_state(state: &str) -> Self {
        match state {
            "created" => Self::Created,
            "running" | "restarting" => Self::Running,
            "paused" => Self::Paused,
            "exited" | "dead" | "removing" => Self::Exited,
            _ => Self::Unknown,
        }
    }

    /// Get the state name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Exited => "exited",
            Self::Unknown => "unknown",
        }
    }

    /// Check if the container is consuming engine resources.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A container placed on an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Container identifier assigned by the engine.
    pub id: ContainerId,
    /// The engine hosting the container.
    pub engine: EngineSpec,
    /// Image name the container was created from.
    pub image: String,
    /// Current runtime state.
    pub state: ContainerState,
    /// Reserved CPU share.
    pub cpus: f64,
    /// Reserved memory in megabytes.
    pub memory_mb: f64,
    /// Workload type the container was placed under, if known.
    pub workload_type: Option<WorkloadType>,
}

/// Point-in-time summary of the whole cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    /// Number of engines in the cluster session.
    pub engine_count: usize,
    /// Number of containers across all engines.
    pub container_count: usize,
    /// Number of images across all engines.
    pub image_count: usize,
    /// Total CPU capacity.
    pub cpus: f64,
    /// Total memory capacity in megabytes.
    pub memory_mb: f64,
    /// CPU reserved by active containers.
    pub reserved_cpus: f64,
    /// Memory reserved by active containers, in megabytes.
    pub reserved_memory_mb: f64,
}
