//! capa-reconciler - MachineSet capacity controller

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use capa_reconciler::config::ControllerConfig;
use capa_reconciler::controller::{error_policy, reconcile, Context};
use capa_reconciler::crd::MachineSet;
use capa_reconciler::store::KubeStore;
use capa_reconciler::telemetry::init_logging;

/// capa-reconciler - annotates MachineSets with instance type capacity
#[derive(Parser, Debug)]
#[command(name = "capa-reconciler", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ControllerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.config.log_format)?;
    cli.config.validate()?;

    run_controller(cli.config).await
}

/// Run the MachineSet controller until a shutdown signal arrives
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    tracing::info!(
        controller = %config.controller_name,
        namespace = config.namespace.as_deref().unwrap_or("<all>"),
        endpoints = config.endpoints.len(),
        "capa-reconciler starting"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let store = Arc::new(KubeStore::with_timeout(client.clone(), config.store_timeout()));
    let ctx = Arc::new(
        Context::new(store, config.controller_name.clone()).with_endpoints(config.endpoints.clone()),
    );

    let machine_sets: Api<MachineSet> = match &config.namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    Controller::new(machine_sets, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    tracing::debug!(machineset = %object, ?action, "MachineSet reconciliation completed");
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "MachineSet reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("capa-reconciler shutting down");
    Ok(())
}
