//! Command handlers.

use std::path::Path;

use anyhow::Context;
use dockyard_control::{Manager, ManagerConfig, RunRequest};
use dockyard_core::{CoreError, EngineSpec};
use dockyard_store::{EngineConfig, RocksStore};

use crate::output;
use crate::{Command, EngineAddArgs, RunArgs};

/// Open the manager, execute one command and shut down.
///
/// Shutdown runs whether or not the command succeeded, so the events of a
/// partially failed run still reach the log.
pub async fn execute(config: ManagerConfig, command: Command) -> anyhow::Result<()> {
    let manager = Manager::open(config)
        .await
        .context("failed to initialize dockyard")?;

    let result = dispatch(&manager, command).await;
    manager.shutdown().await;
    result
}

async fn dispatch(manager: &Manager<RocksStore>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => {
            let request = run_request(args);
            for container in manager.run(&request).await? {
                println!("{}", output::started(&container));
            }
        }
        Command::Engines => {
            print!("{}", output::engine_table(&manager.engines()));
        }
        Command::EngineAdd(args) => {
            let config = engine_config(args)?;
            let id = config.id().clone();
            manager.add_engine(config)?;
            println!("added {id}");
        }
        Command::EngineRemove { id } => {
            manager.remove_engine(&id)?;
            println!("removed {id}");
        }
        Command::EngineInspect { id } => {
            let config = manager
                .get_engine(&id)
                .ok_or(CoreError::EngineNotFound(id))?;
            println!("{}", output::engine_json(&config)?);
        }
        Command::Containers => {
            print!("{}", output::container_table(&manager.containers().await?));
        }
        Command::ContainerInspect { prefix } => {
            let container = manager
                .get_container(&prefix)
                .await?
                .with_context(|| format!("no container matches {prefix:?}"))?;
            println!("{}", serde_json::to_string_pretty(&container)?);
        }
        Command::Info => {
            print!("{}", output::cluster_info(&manager.cluster_info().await?));
        }
        Command::Events => {
            for event in manager.events()? {
                println!("{}", output::event_line(&event));
            }
        }
    }

    Ok(())
}

fn run_request(args: RunArgs) -> RunRequest {
    RunRequest {
        name: args.name,
        workload_type: args.workload_type,
        cpus: args.cpus,
        memory_mb: args.memory,
        hostname: args.hostname,
        domainname: args.domain,
        labels: args.labels,
        args: args.args,
        environment: args.env,
        ports: args.ports,
        pull: args.pull,
        count: args.count,
    }
}

fn engine_config(args: EngineAddArgs) -> anyhow::Result<EngineConfig> {
    let mut spec = EngineSpec::new(args.id, args.addr);
    spec.cpus = args.cpus;
    spec.memory_mb = args.memory;
    spec.labels = args.labels;

    let mut config = EngineConfig::new(spec);
    config.ca_certificate = read_optional(args.ca_cert.as_deref())?;
    config.client_certificate = read_optional(args.ssl_cert.as_deref())?;
    config.client_key = read_optional(args.ssl_key.as_deref())?;
    Ok(config)
}

fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<Vec<u8>>> {
    path.map(|p| std::fs::read(p).with_context(|| format!("failed to read {}", p.display())))
        .transpose()
}
