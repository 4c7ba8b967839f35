//! tlink-opc-bridge - TLINK telemetry to address space bridge
//!
//! Polls the TLINK cloud for devices and their sensors and mirrors them into
//! an address space tree (folder → device → sensor), with a small read-only
//! HTTP API for browsing it.

mod api;
mod cli;
mod config;
mod error;
mod nodespace;
mod sync;
mod tlink;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::InspectState;
use crate::cli::Command;
use crate::error::HostError;
use crate::nodespace::{AddressSpace, NodeId, NodeSpace, Namespaces};
use crate::sync::{NodeLayout, SyncEngine, SyncScheduler};
use crate::tlink::TlinkClient;

/// Identifier of the vendor folder in the folder namespace
const FOLDER_ID: u32 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let debug = match cli::parse(std::env::args().skip(1)) {
        Ok(Command::Run { debug }) => debug,
        Ok(Command::Help) => {
            println!("{}", cli::USAGE);
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("tlink_opc_bridge=debug,tower_http=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "tlink_opc_bridge=info".into())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Starting tlink-opc-bridge...");

    // Load configuration
    let config = config::Config::load().map_err(|e| {
        tracing::error!("Configuration failed: {:#}", e);
        e
    })?;
    tracing::info!("Configuration loaded");

    // Address space: namespaces and the vendor folder
    let space = Arc::new(AddressSpace::new());
    let namespaces = Namespaces {
        folder: space.add_namespace("folder").await,
        device: space.add_namespace("device").await,
        sensor: space.add_namespace("sensor").await,
    };
    let folder = NodeId::new(namespaces.folder, FOLDER_ID);
    let folder_name = &config.address_space.folder_name;
    let status = space
        .create_object_node(folder, NodeId::OBJECTS_FOLDER, folder_name, folder_name)
        .await;
    HostError::check("create_object_node", folder, status)
        .context("address space initialization failed")?;
    tracing::info!(
        "Address space ready ({} nodes), folder {} [{}]",
        space.len().await,
        folder,
        folder_name
    );

    let layout = NodeLayout {
        namespaces,
        folder,
        generic_device_name: config.address_space.generic_device_name.clone(),
    };

    let client = Arc::new(TlinkClient::new(&config.api, config.account())?);
    let engine = Arc::new(SyncEngine::new(
        client,
        space.clone(),
        layout,
        config.sync.page_size,
    ));
    let scheduler = Arc::new(SyncScheduler::new(
        engine,
        Duration::from_millis(config.sync.initial_delay_ms),
        Duration::from_millis(config.sync.interval_ms),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_task = tokio::spawn(scheduler.start(shutdown_rx.clone()));

    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    if config.inspect.enabled {
        let addr: SocketAddr = config
            .inspect
            .bind
            .parse()
            .with_context(|| format!("invalid inspect.bind: {}", config.inspect.bind))?;
        let app = api::app(InspectState {
            space: space.clone(),
            root: folder,
        });

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Inspection API listening on {}", addr);

        let mut rx = shutdown_rx.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.wait_for(|stop| *stop).await;
            })
            .await?;
    }

    sync_task.await?;
    tracing::info!("Stopped");

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
