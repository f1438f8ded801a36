// Path: crates/node/src/main.rs

//! The Warden node: REST gateway + signing coordinator, wired from a TOML
//! config file.

mod config;
mod stores;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use warden_api::chain::ChainRegistry;
use warden_api::scheme::SchemeEngine;
use warden_chain_evm::EvmChain;
use warden_coordinator::coordinator::CoordinatorDeps;
use warden_coordinator::rules::RulesEvaluator;
use warden_coordinator::{CoordinatorConfig, SigningCoordinator};
use warden_scheme::bridge::GmpBridge;
use warden_scheme::Cggmp24Engine;

use crate::config::NodeConfig;
use crate::stores::{ConfigPolicyRepo, ConfigSignerRepo, FileShareStore, MemoryAuditLog};

/// Configuration for the Warden node binary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct NodeOpts {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "warden.toml")]
    config: PathBuf,

    /// Overrides the configured listen address.
    /// SECURITY: Do not bind to public interfaces (0.0.0.0) without the
    /// auth guards and TLS termination in front.
    #[arg(long)]
    listen_addr: Option<String>,

    /// Appends every audit entry to this JSONL file as well.
    #[arg(long)]
    audit_mirror: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("warden-node")?;

    let opts = NodeOpts::parse();
    let config = NodeConfig::load(&opts.config)?;

    let listen_addr: SocketAddr = opts
        .listen_addr
        .as_deref()
        .unwrap_or(&config.listen_addr)
        .parse()
        .context("invalid listen address")?;

    let mut registry = ChainRegistry::new();
    for chain in &config.chains {
        registry.register(Arc::new(EvmChain::new(chain.chain_id, chain.rpc_url.clone())?));
        tracing::info!(chain_id = chain.chain_id, rpc = %chain.rpc_url, "registered chain");
    }

    let native_engine: Option<Arc<dyn SchemeEngine>> = match &config.native_signer_helper {
        Some(helper) => {
            let bridge = GmpBridge::spawn(helper)
                .with_context(|| format!("spawn native helper {}", helper.display()))?;
            tracing::info!(helper = %helper.display(), "native signing helper attached");
            Some(Arc::new(bridge))
        }
        None => None,
    };

    tracing::info!(
        signers = config.signers.len(),
        policies = config.policies.len(),
        "loading registries from config"
    );

    let coordinator = Arc::new(SigningCoordinator::new(
        CoordinatorDeps {
            signers: Arc::new(ConfigSignerRepo::new(config.signers)),
            shares: Arc::new(FileShareStore),
            audit: Arc::new(MemoryAuditLog::new(opts.audit_mirror)),
            policies: Arc::new(ConfigPolicyRepo::new(config.policies)),
            rules: Arc::new(RulesEvaluator::new()),
            chains: Arc::new(registry),
            wasm_engine: Arc::new(Cggmp24Engine::new()),
            native_engine,
        },
        CoordinatorConfig::default(),
    ));

    let sweeper = coordinator.spawn_sweeper();

    let app = warden_gateway::router(coordinator.clone());
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("bind {listen_addr}"))?;
    tracing::info!(%listen_addr, "Warden signing gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Destroy every live session (and wipe its key material) before exit.
    sweeper.abort();
    coordinator.shutdown().await;
    tracing::info!("all signing sessions destroyed; goodbye");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
