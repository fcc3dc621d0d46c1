//! MutatingWebhookConfiguration registration.
//!
//! The configuration routes pod CREATE requests from namespaces labelled
//! `namespace-node-affinity=enabled` to the webhook service. Admission never
//! blocks on the webhook: the failure policy is `Ignore`.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    WebhookClientConfig,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{ObjectMeta, PostParams};
use kube::{Api, Client};
use tracing::info;

use crate::error::{Error, Result};
use crate::webhooks::server::MUTATE_PATH;

/// Namespace label opting a namespace into injection
pub const NAMESPACE_SELECTOR_LABEL: &str = "namespace-node-affinity";
/// Value the namespace label must carry
pub const NAMESPACE_SELECTOR_VALUE: &str = "enabled";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Webhook name for a service: `<service>.<namespace>.svc`
pub fn webhook_name(service_name: &str, namespace: &str) -> String {
    format!("{service_name}.{namespace}.svc")
}

/// Build the MutatingWebhookConfiguration for the webhook service
pub fn mutating_webhook_configuration(
    name: &str,
    namespace: &str,
    service_name: &str,
    ca_bundle: &[u8],
) -> MutatingWebhookConfiguration {
    MutatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        webhooks: Some(vec![MutatingWebhook {
            name: webhook_name(service_name, namespace),
            admission_review_versions: strings(&["v1", "v1beta1"]),
            side_effects: "None".to_string(),
            failure_policy: Some("Ignore".to_string()),
            rules: Some(vec![RuleWithOperations {
                operations: Some(strings(&["CREATE"])),
                api_groups: Some(strings(&[""])),
                api_versions: Some(strings(&["v1"])),
                resources: Some(strings(&["pods"])),
                ..Default::default()
            }]),
            client_config: WebhookClientConfig {
                service: Some(ServiceReference {
                    name: service_name.to_string(),
                    namespace: namespace.to_string(),
                    path: Some(MUTATE_PATH.to_string()),
                    ..Default::default()
                }),
                ca_bundle: Some(ByteString(ca_bundle.to_vec())),
                ..Default::default()
            },
            namespace_selector: Some(LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    NAMESPACE_SELECTOR_LABEL.to_string(),
                    NAMESPACE_SELECTOR_VALUE.to_string(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }]),
    }
}

/// Create the configuration, or replace an existing one of the same name.
///
/// The replacement carries over the live object's `resourceVersion`.
pub async fn create_or_update_mutating_webhook_config(
    client: Client,
    config: &MutatingWebhookConfiguration,
) -> Result<()> {
    let api: Api<MutatingWebhookConfiguration> = Api::all(client);
    let name = config.metadata.name.clone().unwrap_or_default();
    let params = PostParams::default();

    match api.create(&params, config).await.map_err(Error::from) {
        Ok(_) => {
            info!(name = %name, "Created MutatingWebhookConfiguration");
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            let existing = api.get(&name).await?;
            let mut updated = config.clone();
            updated.metadata.resource_version = existing.metadata.resource_version;
            api.replace(&name, &params, &updated).await?;
            info!(name = %name, "Updated existing MutatingWebhookConfiguration");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
