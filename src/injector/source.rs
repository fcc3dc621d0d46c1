//! Namespace policy sources.
//!
//! Policy lives in ConfigMaps. Two layouts are supported:
//!
//! - [`NamespaceKeyedSource`]: one ConfigMap in the webhook's own namespace,
//!   with one YAML document per target namespace.
//! - [`FixedKeySource`]: a ConfigMap of the same name in every target
//!   namespace, with `nodeSelectorTerms`, `tolerations` and optionally
//!   `excludedLabels` stored under fixed keys.
//!
//! Each request performs exactly one ConfigMap read. Nothing is cached.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use tracing::debug;

use crate::error::{Error, Result};
use crate::injector::config::NamespaceConfig;

/// Key holding node selector terms in the fixed-key layout
pub const NODE_SELECTOR_TERMS_KEY: &str = "nodeSelectorTerms";
/// Key holding tolerations in the fixed-key layout
pub const TOLERATIONS_KEY: &str = "tolerations";
/// Key holding excluded labels in the fixed-key layout
pub const EXCLUDED_LABELS_KEY: &str = "excludedLabels";

/// Read access to ConfigMaps
#[async_trait]
pub trait ConfigMapStore: Send + Sync {
    /// Fetch a ConfigMap; `Ok(None)` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;
}

/// ConfigMap store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeConfigMapStore {
    client: Client,
}

impl KubeConfigMapStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigMapStore for KubeConfigMapStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Resolves the policy for a target namespace
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn namespace_config(&self, namespace: &str) -> Result<NamespaceConfig>;
}

#[async_trait]
impl<P: PolicySource + ?Sized> PolicySource for Box<P> {
    async fn namespace_config(&self, namespace: &str) -> Result<NamespaceConfig> {
        (**self).namespace_config(namespace).await
    }
}

/// Fetch a ConfigMap's data, mapping every read failure to `MissingConfiguration`
async fn read_data<S: ConfigMapStore>(
    store: &S,
    namespace: &str,
    name: &str,
) -> Result<BTreeMap<String, String>> {
    let config_map = match store.get(namespace, name).await {
        Ok(Some(cm)) => cm,
        Ok(None) => {
            return Err(Error::MissingConfiguration(format!(
                "configmap {namespace}/{name} not found"
            )));
        }
        Err(e) => {
            return Err(Error::MissingConfiguration(format!(
                "failed to read configmap {namespace}/{name}: {e}"
            )));
        }
    };
    Ok(config_map.data.unwrap_or_default())
}

/// One shared ConfigMap, keyed by target namespace
pub struct NamespaceKeyedSource<S> {
    store: S,
    /// Namespace holding the ConfigMap (where the webhook runs)
    namespace: String,
    config_map_name: String,
}

impl<S: ConfigMapStore> NamespaceKeyedSource<S> {
    pub fn new(store: S, namespace: impl Into<String>, config_map_name: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            config_map_name: config_map_name.into(),
        }
    }
}

#[async_trait]
impl<S: ConfigMapStore> PolicySource for NamespaceKeyedSource<S> {
    async fn namespace_config(&self, namespace: &str) -> Result<NamespaceConfig> {
        let data = read_data(&self.store, &self.namespace, &self.config_map_name).await?;
        let document = data.get(namespace).ok_or_else(|| {
            Error::MissingConfiguration(format!(
                "no entry for {namespace} in configmap {}/{}",
                self.namespace, self.config_map_name
            ))
        })?;
        debug!(namespace = %namespace, "Loaded namespace policy");
        NamespaceConfig::from_yaml(namespace, document)
    }
}

/// A ConfigMap in every target namespace, with fixed keys
pub struct FixedKeySource<S> {
    store: S,
    config_map_name: String,
}

impl<S: ConfigMapStore> FixedKeySource<S> {
    pub fn new(store: S, config_map_name: impl Into<String>) -> Self {
        Self {
            store,
            config_map_name: config_map_name.into(),
        }
    }
}

fn decode_key<T: serde::de::DeserializeOwned>(
    data: &BTreeMap<String, String>,
    key: &str,
    namespace: &str,
) -> Result<Option<T>> {
    data.get(key)
        .map(|raw| {
            serde_yaml::from_str(raw).map_err(|e| {
                Error::InvalidConfiguration(format!("failed to decode {key} for {namespace}: {e}"))
            })
        })
        .transpose()
}

#[async_trait]
impl<S: ConfigMapStore> PolicySource for FixedKeySource<S> {
    async fn namespace_config(&self, namespace: &str) -> Result<NamespaceConfig> {
        let data = read_data(&self.store, namespace, &self.config_map_name).await?;
        if !data.contains_key(NODE_SELECTOR_TERMS_KEY) && !data.contains_key(TOLERATIONS_KEY) {
            return Err(Error::MissingConfiguration(format!(
                "neither {NODE_SELECTOR_TERMS_KEY} nor {TOLERATIONS_KEY} found in configmap {namespace}/{}",
                self.config_map_name
            )));
        }

        let config = NamespaceConfig {
            node_selector_terms: decode_key(&data, NODE_SELECTOR_TERMS_KEY, namespace)?,
            tolerations: decode_key(&data, TOLERATIONS_KEY, namespace)?,
            excluded_labels: decode_key(&data, EXCLUDED_LABELS_KEY, namespace)?,
        };
        debug!(namespace = %namespace, "Loaded namespace policy");
        config.validate(namespace)
    }
}
