//! createcerts - bootstrap TLS material and register the mutating webhook.
//!
//! Intended to run as an init container: it mints a CA and a server
//! certificate for the webhook service, writes the server certificate and key
//! where the webhook expects them, and creates (or updates) the
//! MutatingWebhookConfiguration with the CA as its `caBundle`.

use clap::Parser;
use kube::Client;
use tracing::info;

use namespace_node_affinity::certs::{generate_certificates, write_pem};
use namespace_node_affinity::config::CertArgs;
use namespace_node_affinity::webhooks::{
    create_or_update_mutating_webhook_config, mutating_webhook_configuration,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("namespace_node_affinity=info".parse()?)
                .add_directive("createcerts=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    let args = CertArgs::parse();
    info!(
        namespace = %args.namespace,
        service = %args.service_name,
        validity_days = args.validity_days,
        "Generating webhook certificates"
    );

    let certs = generate_certificates(&args.service_name, &args.namespace, args.validity_days)?;

    write_pem(&args.cert, &certs.server_cert_pem)?;
    write_pem(&args.key, &certs.server_key_pem)?;
    info!(cert = %args.cert.display(), key = %args.key.display(), "Wrote certificate and key");

    let client = Client::try_default().await?;
    let config = mutating_webhook_configuration(
        &args.webhook_config_name,
        &args.namespace,
        &args.service_name,
        certs.ca_cert_pem.as_bytes(),
    );
    create_or_update_mutating_webhook_config(client, &config).await?;

    info!(name = %args.webhook_config_name, "Webhook registered");
    Ok(())
}
