//! metadata-router
//!
//! Destination selection for a database router, driven by cluster
//! metadata.
//!
//! # Architecture Overview
//!
//! ```text
//!   topology.toml ──▶ TopologyWatcher ──mpsc──▶ TopologyPump
//!                                                   │
//!                                                   ▼
//!                                       InMemoryMetadataCache
//!                                                   │ notify(instances, reachable, view_id)
//!                                                   ▼
//!   client connection ──▶ MetadataCacheDestination ──▶ Destinations
//!                               │
//!                               └──▶ InvalidationEvent ──▶ connection manager
//! ```

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use metadata_router::config::watcher::TopologyWatcher;
use metadata_router::config::{load_config, RouterConfig};
use metadata_router::destination::invalidation::IgnoreInvalidations;
use metadata_router::destination::{InvalidationEvent, RouteDestination};
use metadata_router::lifecycle::{signals, RouterRuntime, Shutdown};
use metadata_router::metadata::pump::TopologyPump;
use metadata_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "metadata-router")]
#[command(about = "Metadata-cache destination selection for a database router", long_about = None)]
struct Cli {
    /// Router configuration file.
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and exit
    Check,
    /// Print the next selections of each route as JSON
    Plan {
        /// Number of successive selections per route.
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
        /// Only plan this route.
        #[arg(short, long)]
        route: Option<String>,
    },
    /// Follow topology files and report invalidations until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(config = ?cli.config, "metadata-router v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check => {
            println!(
                "configuration OK: {} metadata cache(s), {} route(s)",
                config.metadata_caches.len(),
                config.routes.len()
            );
        }
        Commands::Plan { count, route } => plan(&config, count, route.as_deref())?,
        Commands::Watch => watch(config).await?,
    }

    Ok(())
}

fn plan(
    config: &RouterConfig,
    count: usize,
    only: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = RouterRuntime::start(config, Arc::new(IgnoreInvalidations))?;

    if let Some(name) = only {
        if runtime.route(name).is_none() {
            return Err(format!("unknown route '{}'", name).into());
        }
    }

    let mut plans = Vec::new();
    for group in runtime.routes() {
        if only.is_some_and(|name| name != group.name()) {
            continue;
        }

        let selections: Vec<_> = (0..count)
            .map(|_| {
                let dests = group.destinations();
                json!({
                    "destinations": dests.iter().map(|d| d.address.to_string()).collect::<Vec<_>>(),
                    "primary_fallback": dests.primary_fallback(),
                })
            })
            .collect();

        let primaries: Vec<_> = group
            .primary_destinations()
            .iter()
            .map(|d| d.address.to_string())
            .collect();

        plans.push(json!({
            "route": group.name(),
            "metadata_cache": group.cache_name(),
            "replicaset": group.replicaset(),
            "role": group.server_role(),
            "strategy": group.routing_strategy(),
            "view_id": group.view_id(),
            "primaries": primaries,
            "selections": selections,
        }));
    }

    runtime.stop();
    println!("{}", serde_json::to_string_pretty(&plans)?);
    Ok(())
}

async fn watch(config: RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let (invalidation_tx, mut invalidations) = mpsc::unbounded_channel::<InvalidationEvent>();
    let runtime = RouterRuntime::start(&config, Arc::new(invalidation_tx))?;

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();

    // Watchers must stay alive for the duration of the loop.
    let mut watchers = Vec::new();
    let mut pumps = Vec::new();
    for section in &config.metadata_caches {
        let (Some(path), Some(cache)) = (&section.topology_file, runtime.cache(&section.name))
        else {
            continue;
        };
        let (pump, updates) = TopologyPump::new(cache.clone());
        watchers.push(TopologyWatcher::new(path, section.replicaset.clone(), updates).run()?);
        pumps.push(tokio::spawn(pump.run(shutdown.subscribe())));
    }

    for group in runtime.routes() {
        let destinations: Vec<_> = group
            .get_destinations()
            .iter()
            .map(ToString::to_string)
            .collect();
        tracing::info!(
            route = %group.name(),
            metadata_cache = %group.cache_name(),
            replicaset = %group.replicaset(),
            role = %group.server_role(),
            strategy = %group.routing_strategy(),
            destinations = ?destinations,
            "Route ready"
        );
    }

    tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    loop {
        tokio::select! {
            Some(event) = invalidations.recv() => {
                tracing::warn!(
                    route = %event.group,
                    destination = %event.destination.address,
                    reason = %event.reason,
                    "Connections invalidated"
                );
            }
            _ = stop.recv() => break,
        }
    }

    drop(watchers);
    for pump in pumps {
        match pump.await {
            Ok(applied) => tracing::debug!(applied, "Topology pump finished"),
            Err(e) => tracing::error!(error = %e, "Topology pump failed"),
        }
    }
    runtime.stop();

    tracing::info!("Shutdown complete");
    Ok(())
}
