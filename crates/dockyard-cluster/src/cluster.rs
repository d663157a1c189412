//! The cluster session.

use std::sync::Arc;

use dockyard_core::{ClusterInfo, Container, ContainerState, Event, EventKind, ImageSpec};
use dockyard_engine::Engine;
use dockyard_scheduler::{Reservation, ResourceManager, SchedulerRegistry};
use futures::future::try_join_all;
use tokio::sync::broadcast;

use crate::error::{ClusterError, Result};
use crate::events::EventBus;

/// A live set of engines with placement and event emission.
///
/// A session is immutable once built. Changing the engine set means building
/// a new session.
#[derive(Debug)]
pub struct Cluster {
    engines: Vec<Engine>,
    registry: Arc<SchedulerRegistry>,
    placement: ResourceManager,
    events: EventBus,
}

impl Cluster {
    /// Create a session over `engines`, publishing lifecycle events on `events`.
    #[must_use]
    pub fn new(engines: Vec<Engine>, registry: Arc<SchedulerRegistry>, events: EventBus) -> Self {
        Self {
            engines,
            registry,
            placement: ResourceManager::new(),
            events,
        }
    }

    /// The connected engines, in load order.
    #[must_use]
    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Place, optionally pull, create and start one container for `image`.
    ///
    /// Emits `pull` (when pulling), `create` and `start` events as each step
    /// completes.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::NoScheduler` if the workload type has no
    /// binding, `ClusterError::NoEligibleEngine` if no engine accepts the
    /// image, or an engine error from any step. A container created before a
    /// failing step is left in place.
    pub async fn run(&self, image: &ImageSpec, pull: bool) -> Result<Container> {
        let scheduler = self
            .registry
            .get(image.workload_type)
            .ok_or(ClusterError::NoScheduler(image.workload_type))?;

        let mut accepted = Vec::new();
        for engine in &self.engines {
            if scheduler.schedule(image, engine).await? {
                accepted.push(engine.clone());
            }
        }

        let engine = self
            .placement
            .place(image, &accepted)
            .await?
            .ok_or_else(|| ClusterError::NoEligibleEngine(image.name.clone()))?;
        let engine_id = engine.id();

        tracing::debug!(
            engine_id = %engine_id,
            image = %image.name,
            workload_type = %image.workload_type,
            scheduler = scheduler.name(),
            "Placed workload"
        );

        if pull {
            engine
                .client()
                .pull_image(&image.name)
                .await
                .map_err(|e| ClusterError::engine(engine_id, e))?;
            self.emit(Event::new(EventKind::Pull, engine_id.clone(), &image.name));
        }

        let container_id = engine
            .client()
            .create_container(image)
            .await
            .map_err(|e| ClusterError::engine(engine_id, e))?;
        self.emit(
            Event::new(EventKind::Create, engine_id.clone(), &image.name)
                .with_container(container_id.clone())
                .with_tag("type", image.workload_type.as_str()),
        );

        engine
            .client()
            .start_container(&container_id)
            .await
            .map_err(|e| ClusterError::engine(engine_id, e))?;
        self.emit(
            Event::new(EventKind::Start, engine_id.clone(), &image.name)
                .with_container(container_id.clone())
                .with_tag("type", image.workload_type.as_str()),
        );

        Ok(Container {
            id: container_id,
            engine: engine.spec().clone(),
            image: image.name.clone(),
            state: ContainerState::Running,
            cpus: image.cpus,
            memory_mb: image.memory_mb,
            workload_type: Some(image.workload_type),
        })
    }

    /// List the containers of every engine, tagged with their engine.
    ///
    /// # Errors
    ///
    /// Returns an error if any engine cannot be queried.
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let listings = try_join_all(self.engines.iter().map(|engine| async move {
            let containers = engine
                .client()
                .list_containers()
                .await
                .map_err(|e| ClusterError::engine(engine.id(), e))?;
            Ok::<_, ClusterError>(
                containers
                    .into_iter()
                    .map(|c| Container {
                        id: c.id,
                        engine: engine.spec().clone(),
                        image: c.image,
                        state: c.state,
                        cpus: c.cpus,
                        memory_mb: c.memory_mb,
                        workload_type: c.workload_type,
                    })
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        Ok(listings.into_iter().flatten().collect())
    }

    /// Aggregate capacity, reservations and counts across all engines.
    ///
    /// # Errors
    ///
    /// Returns an error if any engine cannot be queried.
    pub async fn info(&self) -> Result<ClusterInfo> {
        let per_engine = try_join_all(self.engines.iter().map(|engine| async move {
            let client = engine.client();
            let containers = client
                .list_containers()
                .await
                .map_err(|e| ClusterError::engine(engine.id(), e))?;
            let info = client
                .info()
                .await
                .map_err(|e| ClusterError::engine(engine.id(), e))?;
            Ok::<_, ClusterError>((
                engine.spec(),
                Reservation::from_containers(&containers),
                containers.len(),
                info.images,
            ))
        }))
        .await?;

        let mut info = ClusterInfo {
            engine_count: self.engines.len(),
            ..ClusterInfo::default()
        };
        for (spec, reserved, containers, images) in per_engine {
            info.cpus += spec.cpus;
            info.memory_mb += spec.memory_mb;
            info.reserved_cpus += reserved.cpus;
            info.reserved_memory_mb += reserved.memory_mb;
            info.container_count += containers;
            info.image_count += images;
        }

        Ok(info)
    }

    fn emit(&self, event: Event) {
        let receivers = self.events.publish(event);
        if receivers == 0 {
            tracing::trace!("Event published with no subscribers");
        }
    }
}
