//! Cluster lifecycle events.
//!
//! Events are emitted by the cluster session when it acts on an engine and are
//! persisted verbatim into the audit log. They are never mutated after creation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, EngineId};

/// The kind of action an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An image was pulled onto an engine.
    Pull,
    /// A container was created.
    Create,
    /// A container was started.
    Start,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Pull => "pull",
            Self::Create => "create",
            Self::Start => "start",
        })
    }
}

/// A lifecycle event emitted by the cluster session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Engine the action ran on.
    pub engine_id: EngineId,
    /// Container involved, if any.
    pub container_id: Option<ContainerId>,
    /// Image involved.
    pub image: String,
    /// When the event was emitted.
    pub time: DateTime<Utc>,
    /// Free-form payload.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, engine_id: EngineId, image: impl Into<String>) -> Self {
        Self {
            kind,
            engine_id,
            container_id: None,
            image: image.into(),
            time: Utc::now(),
            tags: BTreeMap::new(),
        }
    }

    /// Attach the container the event refers to.
    #[must_use]
    pub fn with_container(mut self, container_id: ContainerId) -> Self {
        self.container_id = Some(container_id);
        self
    }

    /// Attach a payload tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_builder() {
        let engine_id = EngineId::new("e1").unwrap();
        let container_id = ContainerId::new("abcdef").unwrap();
        let event = Event::new(EventKind::Start, engine_id.clone(), "redis")
            .with_container(container_id.clone())
            .with_tag("type", "service");

        assert_eq!(event.kind, EventKind::Start);
        assert_eq!(event.engine_id, engine_id);
        assert_eq!(event.container_id, Some(container_id));
        assert_eq!(event.tags.get("type").map(String::as_str), Some("service"));
    }

    #[test]
    fn event_serde_json() {
        let event = Event::new(EventKind::Pull, EngineId::new("e1").unwrap(), "redis");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"pull\""));
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
