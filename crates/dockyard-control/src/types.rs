//! Request and configuration types for control plane operations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use dockyard_core::{ImageSpec, PortBinding, WorkloadType};
use serde::{Deserialize, Serialize};

/// Request to start one or more containers of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Image name, e.g. `nginx:latest`.
    pub name: String,
    /// Workload type selecting the scheduler binding.
    #[serde(default)]
    pub workload_type: WorkloadType,
    /// CPU share, fractional.
    #[serde(default = "RunRequest::default_cpus")]
    pub cpus: f64,
    /// Memory limit in megabytes.
    #[serde(default = "RunRequest::default_memory_mb")]
    pub memory_mb: f64,
    /// Container hostname.
    #[serde(default)]
    pub hostname: String,
    /// Container domain name.
    #[serde(default)]
    pub domainname: String,
    /// Placement labels, in order.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Arguments passed to the container command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment entries as `key=value` strings.
    #[serde(default)]
    pub environment: Vec<String>,
    /// Port entries as `<proto>/<host>:<container>` strings.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Pull the image on the chosen engine before creating the container.
    #[serde(default)]
    pub pull: bool,
    /// Number of instances. Zero or negative starts nothing.
    #[serde(default = "RunRequest::default_count")]
    pub count: i64,
}

impl RunRequest {
    const fn default_cpus() -> f64 {
        0.1
    }

    const fn default_memory_mb() -> f64 {
        256.0
    }

    const fn default_count() -> i64 {
        1
    }

    /// Create a request for one `service` instance with default resources.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workload_type: WorkloadType::default(),
            cpus: Self::default_cpus(),
            memory_mb: Self::default_memory_mb(),
            hostname: String::new(),
            domainname: String::new(),
            labels: Vec::new(),
            args: Vec::new(),
            environment: Vec::new(),
            ports: Vec::new(),
            pull: false,
            count: Self::default_count(),
        }
    }

    /// Build the image spec for one instance from already parsed parts.
    #[must_use]
    pub fn image_spec(
        &self,
        environment: BTreeMap<String, String>,
        ports: Vec<PortBinding>,
    ) -> ImageSpec {
        ImageSpec {
            name: self.name.clone(),
            cpus: self.cpus,
            memory_mb: self.memory_mb,
            hostname: self.hostname.clone(),
            domainname: self.domainname.clone(),
            labels: self.labels.clone(),
            args: self.args.clone(),
            environment,
            ports,
            workload_type: self.workload_type,
        }
    }
}

/// Configuration for the engine registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Directory holding the `RocksDB` database.
    #[serde(default = "ManagerConfig::default_data_dir")]
    pub data_dir: PathBuf,

    /// Events buffered per subscriber before the slowest one lags.
    #[serde(default = "ManagerConfig::default_event_buffer")]
    pub event_buffer: usize,

    /// Engine API request timeout in seconds.
    #[serde(default = "ManagerConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ManagerConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("/var/lib/dockyard")
    }

    const fn default_event_buffer() -> usize {
        256
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Create a config with defaults and the given data directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Get the engine request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            event_buffer: Self::default_event_buffer(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}
