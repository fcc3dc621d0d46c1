//! namespace-node-affinity library crate
//!
//! A mutating admission webhook that grafts per-namespace node affinity and
//! tolerations onto pods as they are created. This module exports the
//! mutation engine, the webhook server, and the certificate bootstrap used by
//! the `createcerts` binary.

pub mod certs;
pub mod config;
pub mod error;
pub mod health;
pub mod injector;
pub mod webhooks;

pub use error::{Error, Result};
pub use health::HealthState;
pub use injector::{
    FixedKeySource, Injector, KubeConfigMapStore, Mutation, NamespaceConfig, NamespaceKeyedSource,
    PolicySource,
};
pub use webhooks::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    run_webhook_server,
};

use kube::Client;

use config::{PolicySourceKind, WebhookArgs};

/// Build the policy source selected by `args`, backed by the Kubernetes API
pub fn policy_source(client: Client, args: &WebhookArgs) -> Box<dyn PolicySource> {
    let store = KubeConfigMapStore::new(client);
    match args.policy_source {
        PolicySourceKind::NamespaceKeyed => Box::new(NamespaceKeyedSource::new(
            store,
            args.namespace.clone(),
            args.config_map_name.clone(),
        )),
        PolicySourceKind::FixedKey => {
            Box::new(FixedKeySource::new(store, args.config_map_name.clone()))
        }
    }
}
