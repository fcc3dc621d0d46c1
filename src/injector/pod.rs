//! Minimal view of the Pod fields the injector inspects.
//!
//! The k8s-openapi `NodeSelector` makes `nodeSelectorTerms` a required
//! `Vec`, which collapses "unset" and "empty" into the same value. The path
//! resolver needs to tell those apart, so the scheduling chain is decoded
//! into these types where every level stays optional.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{NodeSelectorTerm, Toleration};
use serde::Deserialize;

/// The admitted pod, reduced to labels and scheduling fields
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    #[serde(default)]
    pub metadata: Option<PodMeta>,
    #[serde(default)]
    pub spec: Option<PodSpec>,
}

impl Pod {
    /// Pod labels, empty when unset
    pub fn labels(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.metadata
            .as_ref()
            .and_then(|meta| meta.labels.as_ref())
            .unwrap_or(&EMPTY)
    }

    /// Pod spec, defaulting to an empty spec when unset
    pub fn spec(&self) -> PodSpec {
        self.spec.clone().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PodMeta {
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub affinity: Option<Affinity>,
    #[serde(default)]
    pub tolerations: Option<Vec<Toleration>>,
}

/// `spec.affinity`. Pod (anti-)affinity siblings are not decoded; they are
/// never touched by the patch.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    #[serde(default)]
    pub node_affinity: Option<NodeAffinity>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAffinity {
    #[serde(default)]
    pub required_during_scheduling_ignored_during_execution: Option<NodeSelector>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    #[serde(default)]
    pub node_selector_terms: Option<Vec<NodeSelectorTerm>>,
}
