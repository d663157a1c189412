//! The engine client interface and the engine handle used by the cluster.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dockyard_core::{ContainerId, ContainerState, EngineId, EngineSpec, ImageSpec, WorkloadType};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Trait for talking to a single container engine.
///
/// This trait abstracts the container runtime protocol, allowing for
/// mock implementations in tests.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Pull an image onto the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the engine reports a pull error.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create a container from an image spec, without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the engine rejects the spec.
    async fn create_container(&self, image: &ImageSpec) -> Result<ContainerId>;

    /// Start a previously created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the container cannot start.
    async fn start_container(&self, container_id: &ContainerId) -> Result<()>;

    /// List all containers on the engine, including stopped ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Fetch engine-wide counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn info(&self) -> Result<EngineInfo>;
}

/// A container as reported by its engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container identifier.
    pub id: ContainerId,
    /// Image name.
    pub image: String,
    /// Runtime state.
    pub state: ContainerState,
    /// Reserved CPU share.
    pub cpus: f64,
    /// Reserved memory in megabytes.
    pub memory_mb: f64,
    /// Workload type, if the container was placed by dockyard.
    pub workload_type: Option<WorkloadType>,
}

/// Engine-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Number of containers on the engine.
    pub containers: usize,
    /// Number of images on the engine.
    pub images: usize,
}

/// How the client reaches its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Unencrypted HTTP.
    #[default]
    Plain,
    /// Mutually authenticated TLS.
    Tls,
}

/// A connected engine: its spec, transport and client handle.
#[derive(Clone)]
pub struct Engine {
    spec: EngineSpec,
    transport: Transport,
    client: Arc<dyn EngineClient>,
}

impl Engine {
    /// Create a new engine handle.
    #[must_use]
    pub fn new(spec: EngineSpec, transport: Transport, client: Arc<dyn EngineClient>) -> Self {
        Self {
            spec,
            transport,
            client,
        }
    }

    /// The engine ID.
    #[must_use]
    pub const fn id(&self) -> &EngineId {
        &self.spec.id
    }

    /// The engine spec.
    #[must_use]
    pub const fn spec(&self) -> &EngineSpec {
        &self.spec
    }

    /// The transport the client was configured with.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// The client used to talk to the engine.
    #[must_use]
    pub fn client(&self) -> &dyn EngineClient {
        self.client.as_ref()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.spec.id)
            .field("addr", &self.spec.addr)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
