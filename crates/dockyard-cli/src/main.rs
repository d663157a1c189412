//! Dockyard CLI - manage engines and run containers across a cluster.
//!
//! This is the entry point for the `dockyard` binary.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use dockyard_control::ManagerConfig;
use dockyard_core::{EngineId, WorkloadType};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dockyard - a control plane for clusters of container engines.
#[derive(Parser, Debug)]
#[command(name = "dockyard")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the dockyard database.
    #[arg(
        long,
        global = true,
        env = "DOCKYARD_DATA_DIR",
        default_value = "/var/lib/dockyard"
    )]
    data_dir: PathBuf,

    /// Engine API request timeout in seconds.
    #[arg(long, global = true, env = "DOCKYARD_REQUEST_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Enable debug logging.
    #[arg(long, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run containers of an image on the cluster.
    Run(RunArgs),
    /// List registered engines.
    Engines,
    /// Register an engine.
    EngineAdd(EngineAddArgs),
    /// Remove an engine.
    EngineRemove {
        /// Engine ID.
        id: EngineId,
    },
    /// Show an engine as JSON.
    EngineInspect {
        /// Engine ID.
        id: EngineId,
    },
    /// List containers across the cluster.
    Containers,
    /// Show a container as JSON, looked up by ID prefix.
    ContainerInspect {
        /// Container ID or unique prefix.
        prefix: String,
    },
    /// Show cluster capacity and usage.
    Info,
    /// Show the event log.
    Events,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Image name.
    #[arg(long)]
    name: String,

    /// CPU share.
    #[arg(long, default_value_t = 0.1)]
    cpus: f64,

    /// Memory limit in megabytes.
    #[arg(long, default_value_t = 256.0)]
    memory: f64,

    /// Workload type: service, unique, host or multi.
    #[arg(long = "type", default_value = "service")]
    workload_type: WorkloadType,

    /// Container hostname.
    #[arg(long, default_value = "")]
    hostname: String,

    /// Container domain name.
    #[arg(long, default_value = "")]
    domain: String,

    /// Environment variable as key=value (repeatable).
    #[arg(long = "env", short = 'e')]
    env: Vec<String>,

    /// Argument passed to the container (repeatable).
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Placement label (repeatable). `host:<engine-id>` pins to an engine.
    #[arg(long = "label", short = 'l')]
    labels: Vec<String>,

    /// Port as <proto>/<host>:<container> (repeatable).
    #[arg(long = "port", short = 'p')]
    ports: Vec<String>,

    /// Pull the image before starting.
    #[arg(long)]
    pull: bool,

    /// Number of instances.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    count: i64,
}

#[derive(ClapArgs, Debug)]
struct EngineAddArgs {
    /// Engine ID.
    #[arg(long)]
    id: EngineId,

    /// Engine API address, e.g. tcp://10.0.0.5:2376.
    #[arg(long)]
    addr: String,

    /// CPU capacity. 0 is unlimited.
    #[arg(long, default_value_t = 0.0)]
    cpus: f64,

    /// Memory capacity in megabytes. 0 is unlimited.
    #[arg(long, default_value_t = 0.0)]
    memory: f64,

    /// Engine label (repeatable).
    #[arg(long = "label", short = 'l')]
    labels: Vec<String>,

    /// Path to the CA certificate (PEM).
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Path to the client certificate (PEM).
    #[arg(long)]
    ssl_cert: Option<PathBuf>,

    /// Path to the client key (PEM).
    #[arg(long)]
    ssl_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug {
        "debug"
    } else {
        "warn,dockyard=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ManagerConfig {
        data_dir: args.data_dir,
        request_timeout_seconds: args.timeout,
        ..ManagerConfig::default()
    };
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        timeout_seconds = config.request_timeout_seconds,
        "Configuration loaded"
    );

    commands::execute(config, args.command).await
}
