//! JSON-Patch construction.
//!
//! Every operation is an `add`. Paths are computed against the pod as it was
//! admitted, so appends to an existing array are emitted one element at a
//! time at the `-` marker and the API server applies them in order.

use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, PatchOperation};
use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorTerm, Toleration,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::injector::config::NamespaceConfig;
use crate::injector::path::{
    AffinityPath, TolerationsPath, resolve_affinity_path, resolve_tolerations_path,
};
use crate::injector::pod::PodSpec;

/// Serialization strategy for the assembled patch document
pub trait PatchSerializer: Send + Sync {
    fn serialize(&self, patch: &Patch) -> std::result::Result<Vec<u8>, serde_json::Error>;
}

/// Compact JSON encoding with serde_json
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonPatchSerializer;

impl PatchSerializer for JsonPatchSerializer {
    fn serialize(&self, patch: &Patch) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(patch)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::FailedToCreatePatch(e.to_string()))
}

fn add(path: &str, value: Value) -> Result<PatchOperation> {
    let path = PointerBuf::parse(path)
        .map_err(|e| Error::FailedToCreatePatch(format!("invalid pointer {path:?}: {e}")))?;
    Ok(PatchOperation::Add(AddOperation { path, value }))
}

fn node_selector(terms: &[NodeSelectorTerm]) -> NodeSelector {
    NodeSelector {
        node_selector_terms: terms.to_vec(),
    }
}

fn node_affinity(terms: &[NodeSelectorTerm]) -> NodeAffinity {
    NodeAffinity {
        required_during_scheduling_ignored_during_execution: Some(node_selector(terms)),
        ..Default::default()
    }
}

/// Operations that graft `terms` onto the pod at `path`
pub fn affinity_operations(
    path: AffinityPath,
    terms: &[NodeSelectorTerm],
) -> Result<Vec<PatchOperation>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    if path.is_append() {
        return terms
            .iter()
            .map(|term| add(path.as_str(), to_value(term)?))
            .collect();
    }

    let value = match path {
        AffinityPath::AppendNodeSelectorTerms | AffinityPath::AddNodeSelectorTerms => {
            to_value(&terms)?
        }
        AffinityPath::AddRequiredDuringScheduling => to_value(&node_selector(terms))?,
        AffinityPath::CreateNodeAffinity => to_value(&node_affinity(terms))?,
        AffinityPath::CreateAffinity => to_value(&Affinity {
            node_affinity: Some(node_affinity(terms)),
            ..Default::default()
        })?,
    };

    Ok(vec![add(path.as_str(), value)?])
}

/// Operations that graft `tolerations` onto the pod at `path`
pub fn tolerations_operations(
    path: TolerationsPath,
    tolerations: &[Toleration],
) -> Result<Vec<PatchOperation>> {
    if tolerations.is_empty() {
        return Ok(Vec::new());
    }

    if path.is_append() {
        tolerations
            .iter()
            .map(|toleration| add(path.as_str(), to_value(toleration)?))
            .collect()
    } else {
        Ok(vec![add(path.as_str(), to_value(&tolerations)?)?])
    }
}

/// Build the ordered patch document: affinity first, then tolerations
pub fn build_operations(config: &NamespaceConfig, spec: &PodSpec) -> Result<Patch> {
    let mut operations = affinity_operations(
        resolve_affinity_path(spec),
        config.node_selector_terms(),
    )?;
    operations.extend(tolerations_operations(
        resolve_tolerations_path(spec),
        config.tolerations(),
    )?);
    Ok(Patch(operations))
}

/// Build and serialize the patch document
pub fn build_patch(
    config: &NamespaceConfig,
    spec: &PodSpec,
    serializer: &dyn PatchSerializer,
) -> Result<Vec<u8>> {
    let patch = build_operations(config, spec)?;
    serializer
        .serialize(&patch)
        .map_err(|e| Error::FailedToCreatePatch(e.to_string()))
}
