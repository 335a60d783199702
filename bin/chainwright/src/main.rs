//! chainwright deploys an ordered set of interdependent contracts to a network and wires
//! them together.

mod cli;
mod settings;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use chainwright_deploy::{
    AddressRegistry, ChainBackend, DependencyOrchestrator, DeploymentRecord, Manifest,
    NetworkPlan, TracingSink,
    backends::{
        ArtifactStore, DEFAULT_DRY_RUN_SENDER, DEFAULT_RECEIPT_POLL_INTERVAL, DryRunBackend,
        RpcBackend,
    },
    plan_hash, record_path, summary_table,
};
use cli::{BackendKind, Cli};
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let manifest = Manifest::load_from_file(&cli.manifest)?;
    let settings = Settings::load(&cli.manifest, &cli)?;
    let plan = manifest.plan_for(&cli.plan, &cli.network)?;
    let registry = plan.seeded_registry()?;

    tracing::info!(
        plan = %plan.plan,
        network = %plan.network,
        components = plan.specs.len(),
        pinned = plan.config.pinned.len(),
        backend = %cli.backend,
        "Deployment plan loaded"
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step...");
            let _ = cancel_tx.send(true);
        }
    });

    let from = settings.from.or(plan.config.from);

    match cli.backend {
        BackendKind::DryRun => {
            let backend = DryRunBackend::new(from.unwrap_or(DEFAULT_DRY_RUN_SENDER), 0);
            run(backend, &plan, registry, cancel_rx, None).await
        }
        BackendKind::Rpc => {
            let rpc_url = settings
                .rpc_url
                .clone()
                .or_else(|| plan.config.rpc_url.clone())
                .with_context(|| {
                    format!("No rpc_url configured for network '{}'", plan.network)
                })?;
            let artifacts = ArtifactStore::open(&settings.artifacts)?;
            let backend = RpcBackend::connect(rpc_url, from, artifacts)
                .await?
                .with_receipt_timing(
                    DEFAULT_RECEIPT_POLL_INTERVAL,
                    Duration::from_secs(settings.receipt_timeout),
                );
            run(backend, &plan, registry, cancel_rx, Some(&settings)).await
        }
    }
}

/// Run the plan and report. The record is written only when `settings` is given, so a
/// dry run never overwrites the record of a real deployment.
async fn run<B: ChainBackend>(
    backend: B,
    plan: &NetworkPlan,
    registry: AddressRegistry,
    cancel: watch::Receiver<bool>,
    settings: Option<&Settings>,
) -> Result<()> {
    let record = DeploymentRecord::start(&plan.network, &plan.plan, plan_hash(plan)?, B::BACKEND_NAME);
    let sink =
        TracingSink::new(plan.network.clone()).with_verify_command(plan.config.verify_command());

    let mut orchestrator = DependencyOrchestrator::new(backend, sink, plan.network.clone(), registry)
        .with_cancellation(cancel);
    let result = orchestrator.run(&plan.specs).await;

    println!(
        "{}",
        summary_table(orchestrator.components(), orchestrator.children())
    );
    for command in orchestrator.sink().verify_commands() {
        println!("{command}");
    }

    if let Some(settings) = settings {
        let record = record.finish(
            orchestrator.components(),
            orchestrator.children(),
            result.as_ref().map(|_| ()),
        );
        record.save_to_file(&record_path(&settings.outdata, &plan.network, &plan.plan))?;
    }

    result.context("Deployment aborted")?;

    Ok(())
}
