//! Workload type to strategy bindings.

use std::collections::HashMap;
use std::sync::Arc;

use dockyard_core::WorkloadType;
use parking_lot::RwLock;

use crate::strategy::{HostScheduler, LabelScheduler, MultiScheduler, Scheduler, UniqueScheduler};

/// Maps each workload type to the strategy that places it.
///
/// Each type has at most one binding. Registering a type again replaces the
/// previous binding.
#[derive(Default)]
pub struct SchedulerRegistry {
    bindings: RwLock<HashMap<WorkloadType, Arc<dyn Scheduler>>>,
}

impl SchedulerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the standard bindings:
    ///
    /// | type      | strategy        |
    /// |-----------|-----------------|
    /// | `service` | label           |
    /// | `unique`  | unique          |
    /// | `host`    | host            |
    /// | `multi`   | label + unique  |
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let label: Arc<dyn Scheduler> = Arc::new(LabelScheduler);
        let unique: Arc<dyn Scheduler> = Arc::new(UniqueScheduler);

        registry.register(WorkloadType::Service, Arc::clone(&label));
        registry.register(WorkloadType::Unique, Arc::clone(&unique));
        registry.register(WorkloadType::Host, Arc::new(HostScheduler));
        registry.register(
            WorkloadType::Multi,
            Arc::new(MultiScheduler::new(vec![label, unique])),
        );
        registry
    }

    /// Bind `scheduler` to `workload_type`, returning the replaced binding.
    pub fn register(
        &self,
        workload_type: WorkloadType,
        scheduler: Arc<dyn Scheduler>,
    ) -> Option<Arc<dyn Scheduler>> {
        tracing::debug!(
            workload_type = %workload_type,
            scheduler = scheduler.name(),
            "Registered scheduler"
        );
        self.bindings.write().insert(workload_type, scheduler)
    }

    /// Get the strategy bound to `workload_type`.
    #[must_use]
    pub fn get(&self, workload_type: WorkloadType) -> Option<Arc<dyn Scheduler>> {
        self.bindings.read().get(&workload_type).cloned()
    }

    /// Check whether a type has a binding.
    #[must_use]
    pub fn contains(&self, workload_type: WorkloadType) -> bool {
        self.bindings.read().contains_key(&workload_type)
    }

    /// Get the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Check if the registry has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl std::fmt::Debug for SchedulerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = self.bindings.read();
        let mut map = f.debug_map();
        for (workload_type, scheduler) in bindings.iter() {
            map.entry(workload_type, &scheduler.name());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_every_type() {
        let registry = SchedulerRegistry::with_defaults();

        assert_eq!(registry.len(), 4);
        for ty in WorkloadType::ALL {
            assert!(registry.contains(ty), "missing binding for {ty}");
        }
        assert_eq!(registry.get(WorkloadType::Service).unwrap().name(), "label");
        assert_eq!(registry.get(WorkloadType::Unique).unwrap().name(), "unique");
        assert_eq!(registry.get(WorkloadType::Host).unwrap().name(), "host");
        assert_eq!(registry.get(WorkloadType::Multi).unwrap().name(), "multi");
    }

    #[test]
    fn reregistration_overwrites() {
        let registry = SchedulerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(WorkloadType::Service).is_none());

        assert!(registry
            .register(WorkloadType::Service, Arc::new(LabelScheduler))
            .is_none());
        let previous = registry.register(WorkloadType::Service, Arc::new(HostScheduler));

        assert_eq!(previous.unwrap().name(), "label");
        assert_eq!(registry.get(WorkloadType::Service).unwrap().name(), "host");
        assert_eq!(registry.len(), 1);
    }
}
