//! Capacity-aware selection among accepted engines.

use dockyard_core::ImageSpec;
use dockyard_engine::{ContainerSummary, Engine};
use futures::future::try_join_all;

use crate::error::Result;

/// Resources held by the active containers of one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reservation {
    /// Reserved CPU share.
    pub cpus: f64,
    /// Reserved memory in megabytes.
    pub memory_mb: f64,
    /// Number of active containers.
    pub containers: usize,
}

impl Reservation {
    /// Sum the reservations of the active containers in `containers`.
    #[must_use]
    pub fn from_containers(containers: &[ContainerSummary]) -> Self {
        containers
            .iter()
            .filter(|c| c.state.is_active())
            .fold(Self::default(), |acc, c| Self {
                cpus: acc.cpus + c.cpus,
                memory_mb: acc.memory_mb + c.memory_mb,
                containers: acc.containers + 1,
            })
    }
}

/// Picks the engine that hosts a workload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceManager;

impl ResourceManager {
    /// Create a resource manager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Choose one of `candidates` for `image`.
    ///
    /// An engine qualifies when its unreserved capacity covers the image; a
    /// capacity of zero is unlimited. Among qualifying engines the one with
    /// the fewest active containers wins, ties going to the earlier engine.
    /// Returns `None` when no engine qualifies.
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate's containers cannot be listed.
    pub async fn place(&self, image: &ImageSpec, candidates: &[Engine]) -> Result<Option<Engine>> {
        let listings = try_join_all(
            candidates
                .iter()
                .map(|engine| engine.client().list_containers()),
        )
        .await?;

        let mut best: Option<(&Engine, usize)> = None;
        for (engine, containers) in candidates.iter().zip(&listings) {
            let reserved = Reservation::from_containers(containers);
            if !fits(image, engine, reserved) {
                tracing::debug!(
                    engine_id = %engine.id(),
                    reserved_cpus = reserved.cpus,
                    reserved_memory_mb = reserved.memory_mb,
                    "Engine lacks capacity"
                );
                continue;
            }
            if best.map_or(true, |(_, count)| reserved.containers < count) {
                best = Some((engine, reserved.containers));
            }
        }

        Ok(best.map(|(engine, _)| engine.clone()))
    }
}

fn fits(image: &ImageSpec, engine: &Engine, reserved: Reservation) -> bool {
    let spec = engine.spec();
    let cpu_ok = spec.cpus <= 0.0 || reserved.cpus + image.cpus <= spec.cpus;
    let memory_ok = spec.memory_mb <= 0.0 || reserved.memory_mb + image.memory_mb <= spec.memory_mb;
    cpu_ok && memory_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::{EngineId, EngineSpec};
    use dockyard_engine::{EngineClient, MockEngineClient, Transport};
    use std::sync::Arc;

    fn engine(id: &str, cpus: f64, memory_mb: f64) -> (Engine, Arc<MockEngineClient>) {
        let mut spec = EngineSpec::new(EngineId::new(id).unwrap(), format!("tcp://{id}:2375"));
        spec.cpus = cpus;
        spec.memory_mb = memory_mb;
        let client = Arc::new(MockEngineClient::new());
        (
            Engine::new(spec, Transport::Plain, Arc::clone(&client) as Arc<dyn EngineClient>),
            client,
        )
    }

    async fn run_on(client: &MockEngineClient, image: &ImageSpec) {
        let id = client.create_container(image).await.unwrap();
        client.start_container(&id).await.unwrap();
    }

    #[tokio::test]
    async fn prefers_fewest_containers() {
        let (busy, busy_client) = engine("busy", 0.0, 0.0);
        let (idle, _) = engine("idle", 0.0, 0.0);
        run_on(&busy_client, &ImageSpec::new("redis")).await;

        let chosen = ResourceManager::new()
            .place(&ImageSpec::new("app"), &[busy, idle])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(chosen.id().as_str(), "idle");
    }

    #[tokio::test]
    async fn ties_keep_engine_order() {
        let (first, _) = engine("first", 0.0, 0.0);
        let (second, _) = engine("second", 0.0, 0.0);

        let chosen = ResourceManager::new()
            .place(&ImageSpec::new("app"), &[first, second])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(chosen.id().as_str(), "first");
    }

    #[tokio::test]
    async fn skips_engines_without_capacity() {
        let (small, _) = engine("small", 1.0, 128.0);
        let (large, large_client) = engine("large", 8.0, 8192.0);
        run_on(&large_client, &ImageSpec::new("redis")).await;

        let mut image = ImageSpec::new("app");
        image.memory_mb = 512.0;

        let chosen = ResourceManager::new()
            .place(&image, &[small, large])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(chosen.id().as_str(), "large");
    }

    #[tokio::test]
    async fn none_when_nothing_fits() {
        let (small, client) = engine("small", 0.5, 0.0);
        let mut image = ImageSpec::new("app");
        image.cpus = 0.4;
        run_on(&client, &image).await;

        let chosen = ResourceManager::new().place(&image, &[small]).await.unwrap();

        assert!(chosen.is_none());
    }

    #[test]
    fn reservation_ignores_inactive_containers() {
        use dockyard_core::{ContainerId, ContainerState};

        let summary = |state, cpus| ContainerSummary {
            id: ContainerId::new("abc").unwrap(),
            image: "redis".to_string(),
            state,
            cpus,
            memory_mb: 100.0,
            workload_type: None,
        };
        let reserved = Reservation::from_containers(&[
            summary(ContainerState::Running, 1.0),
            summary(ContainerState::Exited, 2.0),
        ]);

        assert_eq!(reserved.containers, 1);
        assert!((reserved.cpus - 1.0).abs() < f64::EPSILON);
    }
}
