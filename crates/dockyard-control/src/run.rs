//! The run pipeline: from a request to placed, running containers.

use dockyard_cluster::Cluster;
use dockyard_core::Container;

use crate::error::{ControlError, Result};
use crate::parse::{parse_environment, parse_ports};
use crate::types::RunRequest;

/// Start `request.count` containers on `cluster`, one after another.
///
/// Environment and port strings are parsed once, before anything is started.
/// A count of zero or less starts nothing.
///
/// # Errors
///
/// Returns `ControlError::Parse` if the request strings are malformed, or
/// `ControlError::RunAborted` at the first instance that fails. Containers
/// started by earlier instances keep running.
pub async fn run(cluster: &Cluster, request: &RunRequest) -> Result<Vec<Container>> {
    let environment = parse_environment(&request.environment)?;
    let ports = parse_ports(&request.ports)?;
    let count = usize::try_from(request.count).unwrap_or(0);

    let mut started = Vec::new();
    for iteration in 1..=count {
        let image = request.image_spec(environment.clone(), ports.clone());

        match cluster.run(&image, request.pull).await {
            Ok(container) => {
                tracing::info!(
                    container_id = %container.id.short(),
                    engine_id = %container.engine.id,
                    image = %container.image,
                    "Started container"
                );
                started.push(container);
            }
            Err(source) => {
                tracing::error!(
                    image = %request.name,
                    iteration,
                    count,
                    error = %source,
                    "Run aborted"
                );
                return Err(ControlError::RunAborted {
                    iteration,
                    started: started.len(),
                    source,
                });
            }
        }
    }

    Ok(started)
}
