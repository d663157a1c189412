//! Per-engine placement strategies.
//!
//! A strategy answers one question: may this image run on this engine? The
//! cluster session asks it for every connected engine and hands the accepted
//! ones to the [`ResourceManager`](crate::ResourceManager).

use std::sync::Arc;

use async_trait::async_trait;
use dockyard_core::ImageSpec;
use dockyard_engine::Engine;

use crate::error::Result;

/// Prefix of the image label pinning a workload to one engine.
pub const HOST_LABEL_PREFIX: &str = "host:";

/// Trait for deciding whether an engine may host an image.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return true if `engine` may host `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has to be queried and the query fails.
    async fn schedule(&self, image: &ImageSpec, engine: &Engine) -> Result<bool>;
}

/// Accepts engines carrying every label of the image.
///
/// `host:` labels are placement directives, not engine labels, and are
/// ignored here.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelScheduler;

#[async_trait]
impl Scheduler for LabelScheduler {
    fn name(&self) -> &'static str {
        "label"
    }

    async fn schedule(&self, image: &ImageSpec, engine: &Engine) -> Result<bool> {
        Ok(image
            .labels
            .iter()
            .filter(|label| !label.starts_with(HOST_LABEL_PREFIX))
            .all(|label| engine.spec().has_label(label)))
    }
}

/// Accepts engines not already running a container of the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueScheduler;

#[async_trait]
impl Scheduler for UniqueScheduler {
    fn name(&self) -> &'static str {
        "unique"
    }

    async fn schedule(&self, image: &ImageSpec, engine: &Engine) -> Result<bool> {
        let containers = engine.client().list_containers().await?;
        let duplicate = containers
            .iter()
            .any(|c| c.state.is_active() && c.image == image.name);

        if duplicate {
            tracing::debug!(
                engine_id = %engine.id(),
                image = %image.name,
                "Engine already runs image"
            );
        }

        Ok(!duplicate)
    }
}

/// Accepts only the engine named by a `host:<engine-id>` image label.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostScheduler;

#[async_trait]
impl Scheduler for HostScheduler {
    fn name(&self) -> &'static str {
        "host"
    }

    async fn schedule(&self, image: &ImageSpec, engine: &Engine) -> Result<bool> {
        Ok(image
            .labels
            .iter()
            .filter_map(|label| label.strip_prefix(HOST_LABEL_PREFIX))
            .any(|host| host == engine.id().as_str()))
    }
}

/// Accepts an engine only when every inner strategy accepts it.
///
/// Strategies are evaluated in order and evaluation stops at the first
/// rejection.
#[derive(Clone, Default)]
pub struct MultiScheduler {
    schedulers: Vec<Arc<dyn Scheduler>>,
}

impl MultiScheduler {
    /// Create a composite of the given strategies.
    #[must_use]
    pub fn new(schedulers: Vec<Arc<dyn Scheduler>>) -> Self {
        Self { schedulers }
    }
}

#[async_trait]
impl Scheduler for MultiScheduler {
    fn name(&self) -> &'static str {
        "multi"
    }

    async fn schedule(&self, image: &ImageSpec, engine: &Engine) -> Result<bool> {
        for scheduler in &self.schedulers {
            if !scheduler.schedule(image, engine).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
