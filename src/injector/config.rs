//! Per-namespace injection policy.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{NodeSelectorTerm, Toleration};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Policy applied to pods created in one namespace
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceConfig {
    /// Node selector terms added to required node affinity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector_terms: Option<Vec<NodeSelectorTerm>>,
    /// Tolerations added to the pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
    /// Pods carrying all of these labels are left untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_labels: Option<BTreeMap<String, String>>,
}

impl NamespaceConfig {
    /// Decode a policy document (YAML or JSON) and validate it
    pub fn from_yaml(namespace: &str, document: &str) -> Result<Self> {
        let config: NamespaceConfig = serde_yaml::from_str(document).map_err(|e| {
            Error::InvalidConfiguration(format!("failed to decode config for {namespace}: {e}"))
        })?;
        config.validate(namespace)
    }

    /// Reject policies that would not change anything
    pub fn validate(self, namespace: &str) -> Result<Self> {
        if self.node_selector_terms().is_empty() && self.tolerations().is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "at least one of nodeSelectorTerms or tolerations needs to be specified for {namespace}"
            )));
        }
        Ok(self)
    }

    pub fn node_selector_terms(&self) -> &[NodeSelectorTerm] {
        self.node_selector_terms.as_deref().unwrap_or_default()
    }

    pub fn tolerations(&self) -> &[Toleration] {
        self.tolerations.as_deref().unwrap_or_default()
    }

    /// Whether the pod matches every excluded label pair exactly.
    ///
    /// An empty or absent exclusion set never excludes.
    pub fn excludes(&self, pod_labels: &BTreeMap<String, String>) -> bool {
        match &self.excluded_labels {
            Some(excluded) if !excluded.is_empty() => excluded
                .iter()
                .all(|(key, value)| pod_labels.get(key) == Some(value)),
            _ => false,
        }
    }
}
