//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::certs::DEFAULT_VALIDITY_DAYS;
use crate::health::HEALTH_PORT;
use crate::webhooks::{WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT};

/// Default name of the policy ConfigMap and of the webhook configuration
pub const DEFAULT_NAME: &str = "namespace-node-affinity";

/// Where namespace policy is read from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicySourceKind {
    /// One ConfigMap in the webhook namespace, one entry per target namespace
    #[default]
    NamespaceKeyed,
    /// A ConfigMap in every target namespace with fixed keys
    FixedKey,
}

/// Mutating webhook server
#[derive(Parser, Debug, Clone)]
#[command(name = "namespace-node-affinity", version, about)]
pub struct WebhookArgs {
    /// Port serving the admission endpoint over TLS
    #[arg(short, long, env = "PORT", default_value_t = WEBHOOK_PORT)]
    pub port: u16,

    /// Port serving /healthz, /readyz and /metrics
    #[arg(long, env = "HEALTH_PORT", default_value_t = HEALTH_PORT)]
    pub health_port: u16,

    /// Path to the TLS certificate (PEM)
    #[arg(short, long, env = "CERT", default_value = WEBHOOK_CERT_PATH)]
    pub cert: PathBuf,

    /// Path to the TLS private key (PEM)
    #[arg(short, long, env = "KEY", default_value = WEBHOOK_KEY_PATH)]
    pub key: PathBuf,

    /// Name of the ConfigMap holding namespace policy
    #[arg(short = 'm', long, env = "CONFIG_MAP_NAME", default_value = DEFAULT_NAME)]
    pub config_map_name: String,

    /// Namespace the webhook runs in (holds the namespace-keyed ConfigMap)
    #[arg(short, long, env = "NAMESPACE", default_value = DEFAULT_NAME)]
    pub namespace: String,

    /// ConfigMap layout to read policy from
    #[arg(long, env = "POLICY_SOURCE", value_enum, default_value_t = PolicySourceKind::NamespaceKeyed)]
    pub policy_source: PolicySourceKind,

    /// Upper bound on handling a single admission request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl WebhookArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Certificate bootstrap and webhook registration
#[derive(Parser, Debug, Clone)]
#[command(name = "createcerts", version, about)]
pub struct CertArgs {
    /// Namespace the webhook is deployed in
    #[arg(short, long, env = "NAMESPACE", default_value = DEFAULT_NAME)]
    pub namespace: String,

    /// Name of the webhook's Service
    #[arg(short, long, env = "SERVICE_NAME", default_value = DEFAULT_NAME)]
    pub service_name: String,

    /// Name of the MutatingWebhookConfiguration to create or update
    #[arg(long, env = "WEBHOOK_CONFIG_NAME", default_value = DEFAULT_NAME)]
    pub webhook_config_name: String,

    /// Output path for the server certificate (PEM)
    #[arg(short, long, env = "CERT", default_value = WEBHOOK_CERT_PATH)]
    pub cert: PathBuf,

    /// Output path for the server private key (PEM)
    #[arg(short, long, env = "KEY", default_value = WEBHOOK_KEY_PATH)]
    pub key: PathBuf,

    /// Certificate validity in days
    #[arg(long, env = "VALIDITY_DAYS", default_value_t = DEFAULT_VALIDITY_DAYS)]
    pub validity_days: u32,
}
