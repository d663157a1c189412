//! In-memory engines for testing without a container runtime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dockyard_core::{ContainerId, ContainerState, EngineId, EngineSpec, ImageSpec};
use parking_lot::Mutex;

use crate::client::{ContainerSummary, Engine, EngineClient, EngineInfo, Transport};
use crate::connector::Connector;
use crate::error::{EngineError, Result};

/// An engine client that keeps containers in memory.
#[derive(Default)]
pub struct MockEngineClient {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    containers: Vec<ContainerSummary>,
    pulled: Vec<String>,
    fail_pulls: bool,
    starts_remaining: Option<usize>,
}

impl MockEngineClient {
    /// Create an empty mock engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `n` more successful starts, then fail every start.
    pub fn fail_starts_after(&self, n: usize) {
        self.state.lock().starts_remaining = Some(n);
    }

    /// Make every pull fail.
    pub fn fail_pulls(&self) {
        self.state.lock().fail_pulls = true;
    }

    /// Add an existing container directly.
    pub fn insert_container(&self, container: ContainerSummary) {
        self.state.lock().containers.push(container);
    }

    /// Images pulled so far, in order.
    #[must_use]
    pub fn pulled(&self) -> Vec<String> {
        self.state.lock().pulled.clone()
    }

    /// All containers on the engine.
    #[must_use]
    pub fn containers(&self) -> Vec<ContainerSummary> {
        self.state.lock().containers.clone()
    }

    /// Number of running containers.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.state
            .lock()
            .containers
            .iter()
            .filter(|c| c.state == ContainerState::Running)
            .count()
    }
}

/// Generate a 64-character hex container ID.
fn generate_container_id() -> ContainerId {
    let raw = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    ContainerId::new(raw).unwrap_or_else(|_| unreachable!("hex IDs are valid"))
}

#[async_trait]
impl EngineClient for MockEngineClient {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_pulls {
            return Err(EngineError::Pull {
                image: image.to_string(),
                message: "pull refused by mock engine".to_string(),
            });
        }
        state.pulled.push(image.to_string());
        Ok(())
    }

    async fn create_container(&self, image: &ImageSpec) -> Result<ContainerId> {
        let id = generate_container_id();
        self.state.lock().containers.push(ContainerSummary {
            id: id.clone(),
            image: image.name.clone(),
            state: ContainerState::Created,
            cpus: image.cpus,
            memory_mb: image.memory_mb,
            workload_type: Some(image.workload_type),
        });
        Ok(id)
    }

    async fn start_container(&self, container_id: &ContainerId) -> Result<()> {
        let mut state = self.state.lock();
        match state.starts_remaining {
            Some(0) => {
                return Err(EngineError::Api {
                    status: 500,
                    message: "start refused by mock engine".to_string(),
                })
            }
            Some(n) => state.starts_remaining = Some(n - 1),
            None => {}
        }

        let container = state
            .containers
            .iter_mut()
            .find(|c| &c.id == container_id)
            .ok_or_else(|| EngineError::Api {
                status: 404,
                message: format!("no such container: {container_id}"),
            })?;
        container.state = ContainerState::Running;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        Ok(self.containers())
    }

    async fn info(&self) -> Result<EngineInfo> {
        let state = self.state.lock();
        let images: HashSet<&str> = state
            .containers
            .iter()
            .map(|c| c.image.as_str())
            .chain(state.pulled.iter().map(String::as_str))
            .collect();
        Ok(EngineInfo {
            containers: state.containers.len(),
            images: images.len(),
        })
    }
}

/// A connector handing out persistent [`MockEngineClient`]s, one per engine.
#[derive(Default)]
pub struct MockConnector {
    clients: Mutex<HashMap<EngineId, Arc<MockEngineClient>>>,
    transports: Mutex<HashMap<EngineId, Transport>>,
    refused: Mutex<HashSet<EngineId>>,
}

impl MockConnector {
    /// Create a connector with no engines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The client backing an engine, created on first use.
    #[must_use]
    pub fn client(&self, engine_id: &EngineId) -> Arc<MockEngineClient> {
        Arc::clone(
            self.clients
                .lock()
                .entry(engine_id.clone())
                .or_insert_with(|| Arc::new(MockEngineClient::new())),
        )
    }

    /// The transport of the most recent successful connection to an engine.
    #[must_use]
    pub fn transport(&self, engine_id: &EngineId) -> Option<Transport> {
        self.transports.lock().get(engine_id).copied()
    }

    /// Refuse every connection to an engine.
    pub fn refuse(&self, engine_id: &EngineId) {
        self.refused.lock().insert(engine_id.clone());
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        spec: &EngineSpec,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> Result<Engine> {
        if self.refused.lock().contains(&spec.id) {
            return Err(EngineError::Request(format!(
                "connection to {} refused",
                spec.addr
            )));
        }

        let transport = if tls.is_some() {
            Transport::Tls
        } else {
            Transport::Plain
        };
        self.transports.lock().insert(spec.id.clone(), transport);

        Ok(Engine::new(spec.clone(), transport, self.client(&spec.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_start() {
        let client = MockEngineClient::new();
        let id = client.create_container(&ImageSpec::new("redis")).await.unwrap();
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(client.running_count(), 0);

        client.start_container(&id).await.unwrap();
        assert_eq!(client.running_count(), 1);
    }

    #[tokio::test]
    async fn start_budget_exhausted() {
        let client = MockEngineClient::new();
        client.fail_starts_after(1);

        let first = client.create_container(&ImageSpec::new("redis")).await.unwrap();
        let second = client.create_container(&ImageSpec::new("redis")).await.unwrap();

        client.start_container(&first).await.unwrap();
        assert!(client.start_container(&second).await.is_err());
        assert_eq!(client.running_count(), 1);
    }

    #[test]
    fn connector_reuses_clients() {
        let connector = MockConnector::new();
        let spec = EngineSpec::new(EngineId::new("e1").unwrap(), "tcp://e1:2375");

        let engine = connector.connect(&spec, None).unwrap();
        assert_eq!(engine.transport(), Transport::Plain);
        assert_eq!(connector.transport(&spec.id), Some(Transport::Plain));
        assert!(Arc::ptr_eq(&connector.client(&spec.id), &connector.client(&spec.id)));

        connector.refuse(&spec.id);
        assert!(connector.connect(&spec, None).is_err());
    }
}
