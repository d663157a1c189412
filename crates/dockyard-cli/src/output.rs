//! Plain-text and JSON rendering of command results.

use std::fmt::Write as _;

use dockyard_core::{ClusterInfo, Container, EngineSpec, Event};
use dockyard_store::{CertificateMaterial, EngineConfig};
use serde::Serialize;

/// Engine as shown by `engine-inspect`. Certificate bytes are summarized.
#[derive(Serialize)]
struct EngineView<'a> {
    #[serde(flatten)]
    engine: &'a EngineSpec,
    tls: &'static str,
}

fn tls_state(config: &EngineConfig) -> &'static str {
    match config.certificates() {
        CertificateMaterial::Absent => "none",
        CertificateMaterial::Incomplete => "incomplete",
        CertificateMaterial::Complete { .. } => "complete",
    }
}

pub fn started(container: &Container) -> String {
    format!("started {} on {}", container.id.short(), container.engine.id)
}

pub fn engine_table(engines: &[EngineConfig]) -> String {
    let mut out = format!(
        "{:<16} {:<28} {:>6} {:>8} {:<10} {}\n",
        "ID", "ADDR", "CPUS", "MEMORY", "TLS", "LABELS"
    );
    for config in engines {
        let spec = &config.engine;
        let _ = writeln!(
            out,
            "{:<16} {:<28} {:>6} {:>8} {:<10} {}",
            spec.id,
            spec.addr,
            spec.cpus,
            spec.memory_mb,
            tls_state(config),
            spec.labels.join(",")
        );
    }
    out
}

pub fn engine_json(config: &EngineConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&EngineView {
        engine: &config.engine,
        tls: tls_state(config),
    })
}

pub fn container_table(containers: &[Container]) -> String {
    let mut out = format!(
        "{:<12} {:<24} {:<8} {:<16} {:>6} {:>8}\n",
        "ID", "IMAGE", "STATE", "ENGINE", "CPUS", "MEMORY"
    );
    for container in containers {
        let _ = writeln!(
            out,
            "{:<12} {:<24} {:<8} {:<16} {:>6} {:>8}",
            container.id.short(),
            container.image,
            container.state,
            container.engine.id,
            container.cpus,
            container.memory_mb
        );
    }
    out
}

pub fn cluster_info(info: &ClusterInfo) -> String {
    format!(
        "engines:    {}\ncontainers: {}\nimages:     {}\ncpus:       {} / {}\nmemory:     {} / {} MB\n",
        info.engine_count,
        info.container_count,
        info.image_count,
        info.reserved_cpus,
        info.cpus,
        info.reserved_memory_mb,
        info.memory_mb
    )
}

pub fn event_line(event: &Event) -> String {
    let container = event.container_id.as_ref().map_or("-", |id| id.short());
    format!(
        "{} {:<6} {:<16} {:<12} {}",
        event.time.to_rfc3339(),
        event.kind,
        event.engine_id,
        container,
        event.image
    )
}
