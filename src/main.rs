//! namespace-node-affinity - mutating admission webhook for pod scheduling policy.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use tokio::signal;
use tracing::{error, info};

use namespace_node_affinity::config::WebhookArgs;
use namespace_node_affinity::health::{HealthState, run_health_server};
use namespace_node_affinity::{Injector, WebhookState, policy_source, run_webhook_server};

/// Grace period for in-flight admissions to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("namespace_node_affinity=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    let args = WebhookArgs::parse();
    info!(
        port = args.port,
        namespace = %args.namespace,
        config_map = %args.config_map_name,
        policy_source = ?args.policy_source,
        "Starting namespace-node-affinity"
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately so liveness probes pass during start-up
    let health_handle = {
        let health_state = health_state.clone();
        let port = args.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let injector = Injector::new(policy_source(client, &args));
    let state = Arc::new(WebhookState::new(
        injector,
        health_state.clone(),
        args.request_timeout(),
    ));

    let webhook_handle = {
        let (port, cert, key) = (args.port, args.cert.clone(), args.key.clone());
        tokio::spawn(async move {
            if let Err(e) = run_webhook_server(state, port, &cert, &key).await {
                error!("Webhook server error: {}", e);
            }
        })
    };

    health_state.set_ready(true).await;

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready so the endpoint is taken out of rotation
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admissions to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. Failing to install either handler is fatal.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
