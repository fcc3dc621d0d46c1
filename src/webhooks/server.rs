//! Admission webhook server.
//!
//! Serves `POST /mutate` over TLS. The body is handed to the [`Injector`]
//! as raw bytes; the engine's answer is written back unchanged.
//!
//! To enable the webhook:
//! 1. Run `createcerts` to mint the TLS material and register the webhook
//! 2. Mount the certificate and key into the pod at /etc/webhook/certs/

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::health::HealthState;
use crate::injector::{Injector, Mutation};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Path the API server posts AdmissionReviews to
pub const MUTATE_PATH: &str = "/mutate";

/// Metrics outcome label for requests that ran out of time
const TIMEOUT_OUTCOME: &str = "Timeout";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub injector: Injector,
    pub health: Arc<HealthState>,
    /// Upper bound on a single admission, policy read included
    pub request_timeout: Duration,
}

impl WebhookState {
    pub fn new(injector: Injector, health: Arc<HealthState>, request_timeout: Duration) -> Self {
        Self {
            injector,
            health,
            request_timeout,
        }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate))
        .with_state(state)
}

/// Mutating admission handler
async fn mutate(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let started = Instant::now();
    let result = tokio::time::timeout(state.request_timeout, state.injector.review(&body)).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(Ok(mutation)) => {
            state
                .health
                .metrics
                .record_admission(mutation.outcome(), elapsed);
            match mutation {
                Mutation::Skipped => {
                    debug!("Empty admission request, nothing to do");
                    StatusCode::OK.into_response()
                }
                Mutation::Excluded(body) | Mutation::Patched(body) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response(),
            }
        }
        Ok(Err(e)) => {
            error!(error = %e, reason = e.reason(), "Failed to mutate admission request");
            state.health.metrics.record_admission(e.reason(), elapsed);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(_) => {
            error!(
                timeout_secs = state.request_timeout.as_secs_f64(),
                "Admission request timed out"
            );
            state
                .health
                .metrics
                .record_admission(TIMEOUT_OUTCOME, elapsed);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "admission request timed out",
            )
                .into_response()
        }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0 on `port` and serves the /mutate endpoint.
///
/// # Arguments
/// * `state` - Shared handler state
/// * `port` - Listening port
/// * `cert_path` - Path to TLS certificate file (PEM format)
/// * `key_path` - Path to TLS private key file (PEM format)
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookError> {
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
