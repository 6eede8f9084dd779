//! Service Catalog Controller
//!
//! Watches the catalog's custom resources and keeps a local mirror of each:
//! - ServiceBroker: broker registrations (namespace scoped)
//! - ServiceInstance: provisioned service instances (one or all namespaces)
//! - CustomResourceDefinition: the catalog schemas themselves, optionally
//!   seeding a first ServiceBroker once its schema is served
//!
//! Schemas are bootstrapped before any informer starts. SIGINT/SIGTERM stop
//! every informer and the probe server.

mod config;
mod controller;
mod error;
mod handlers;
mod probes;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Service Catalog Controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Broker namespace: {}", config.broker_namespace);
    info!(
        "  Instance namespace: {}",
        config.instance_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!(
        "  Resync: brokers {:?}, instances {:?}, schemas {:?}",
        config.broker_resync, config.instance_resync, config.schema_resync
    );
    info!("  Probe address: {}", config.probe_addr);
    if let Some(seed) = &config.seed_broker_name {
        info!("  Seed broker: {}", seed);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    let controller = Controller::new(config, cancel).await?;
    controller.run().await?;

    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received SIGINT");
    }

    token.cancel();
}
