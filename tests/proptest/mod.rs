// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for namespace-node-affinity.
//!
//! Uses proptest to generate random pod shapes and policies and verify the
//! patch invariants by applying the patches in order.

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;

use namespace_node_affinity::NamespaceConfig;
use namespace_node_affinity::injector::pod::PodSpec;
use namespace_node_affinity::injector::{
    AffinityPath, JsonPatchSerializer, TolerationsPath, build_patch, resolve_affinity_path,
    resolve_tolerations_path,
};
use proptest::prelude::*;
use serde_json::{Value, json};

use common::fixtures::{PodBuilder, required_terms, term, toleration};

/// Strategy for node selector terms (1-5).
fn terms() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(("[a-z]{1,8}", "[a-z0-9]{1,8}"), 1..=5)
        .prop_map(|pairs| pairs.iter().map(|(k, v)| term(k, v)).collect())
}

/// Strategy for tolerations (1-5).
fn tolerations() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec("[a-z]{1,8}", 1..=5)
        .prop_map(|keys| keys.iter().map(|k| toleration(k)).collect())
}

/// Strategy for every shape of `spec.affinity`, paired with the terms it
/// already holds and the path it must resolve to.
fn affinity_shape() -> impl Strategy<Value = (Option<Value>, Vec<Value>, AffinityPath)> {
    prop_oneof![
        Just((None, vec![], AffinityPath::CreateAffinity)),
        Just((
            Some(json!({"podAntiAffinity": {}})),
            vec![],
            AffinityPath::CreateNodeAffinity
        )),
        Just((
            Some(json!({"nodeAffinity": {}})),
            vec![],
            AffinityPath::AddRequiredDuringScheduling
        )),
        Just((
            Some(json!({"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {}}})),
            vec![],
            AffinityPath::AddNodeSelectorTerms
        )),
        prop::collection::vec(("[a-z]{1,8}", "[a-z0-9]{1,8}"), 0..=3).prop_map(|pairs| {
            let existing: Vec<Value> = pairs.iter().map(|(k, v)| term(k, v)).collect();
            (
                Some(json!({"nodeAffinity": {
                    "requiredDuringSchedulingIgnoredDuringExecution": {"nodeSelectorTerms": existing}
                }})),
                existing,
                AffinityPath::AppendNodeSelectorTerms,
            )
        }),
    ]
}

/// Strategy for label maps.
fn labels() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z]{1,6}", 0..=4)
}

fn pod_with(affinity: Option<Value>, tolerations: Option<Vec<Value>>) -> Value {
    let mut builder = PodBuilder::new("pod");
    if let Some(affinity) = affinity {
        builder = builder.affinity(affinity);
    }
    if let Some(tolerations) = tolerations {
        builder = builder.tolerations(tolerations);
    }
    builder.build()
}

fn pod_spec(pod: &Value) -> PodSpec {
    serde_json::from_value(pod["spec"].clone()).unwrap()
}

fn apply(pod: &Value, config: &NamespaceConfig) -> (Vec<Value>, Value) {
    let patch = build_patch(config, &pod_spec(pod), &JsonPatchSerializer).unwrap();
    let patch: json_patch::Patch = serde_json::from_slice(&patch).unwrap();
    let mut patched = pod.clone();
    json_patch::patch(&mut patched, &patch.0).unwrap();
    let ops = serde_json::to_value(&patch).unwrap();
    (ops.as_array().cloned().unwrap_or_default(), patched)
}

fn config(terms: Option<Vec<Value>>, tolerations: Option<Vec<Value>>) -> NamespaceConfig {
    let mut value = json!({});
    if let Some(terms) = terms {
        value["nodeSelectorTerms"] = Value::Array(terms);
    }
    if let Some(tolerations) = tolerations {
        value["tolerations"] = Value::Array(tolerations);
    }
    serde_json::from_value(value).unwrap()
}

proptest! {
    /// Property: Path resolution matches the pod shape and is deterministic.
    #[test]
    fn test_affinity_path_matches_shape((affinity, _existing, expected) in affinity_shape()) {
        let spec = pod_spec(&pod_with(affinity, None));
        prop_assert_eq!(resolve_affinity_path(&spec), expected);
        prop_assert_eq!(resolve_affinity_path(&spec), resolve_affinity_path(&spec));
    }

    /// Property: Applying the patch yields existing terms followed by the
    /// configured terms, in order.
    #[test]
    fn test_applied_terms_are_existing_then_new(
        (affinity, existing, path) in affinity_shape(),
        new_terms in terms()
    ) {
        let pod = pod_with(affinity, None);
        let (ops, patched) = apply(&pod, &config(Some(new_terms.clone()), None));

        let expected: Vec<Value> = existing.iter().chain(new_terms.iter()).cloned().collect();
        prop_assert_eq!(required_terms(&patched), &Value::Array(expected));

        // Appends are one op per term; every other shape is a single insert
        if path == AffinityPath::AppendNodeSelectorTerms {
            prop_assert_eq!(ops.len(), new_terms.len());
        } else {
            prop_assert_eq!(ops.len(), 1);
        }
        for op in &ops {
            prop_assert_eq!(&op["op"], "add");
            prop_assert_eq!(&op["path"], path.as_str());
        }
    }

    /// Property: Sibling affinity fields survive the patch.
    #[test]
    fn test_pod_anti_affinity_is_preserved(new_terms in terms()) {
        let anti = json!({"requiredDuringSchedulingIgnoredDuringExecution": [
            {"topologyKey": "kubernetes.io/hostname"}
        ]});
        let pod = pod_with(Some(json!({"podAntiAffinity": anti})), None);
        let (_, patched) = apply(&pod, &config(Some(new_terms), None));
        prop_assert_eq!(&patched["spec"]["affinity"]["podAntiAffinity"], &anti);
    }

    /// Property: Tolerations are existing followed by configured ones.
    #[test]
    fn test_applied_tolerations_are_existing_then_new(
        existing in prop::option::of(prop::collection::vec("[a-z]{1,8}", 0..=3)),
        new_tolerations in tolerations()
    ) {
        let existing: Option<Vec<Value>> =
            existing.map(|keys| keys.iter().map(|k| toleration(k)).collect());
        let pod = pod_with(None, existing.clone());
        let spec = pod_spec(&pod);
        let expected_path = if existing.is_some() {
            TolerationsPath::AppendTolerations
        } else {
            TolerationsPath::CreateTolerations
        };
        prop_assert_eq!(resolve_tolerations_path(&spec), expected_path);

        let (_, patched) = apply(&pod, &config(None, Some(new_tolerations.clone())));
        let expected: Vec<Value> = existing
            .unwrap_or_default()
            .into_iter()
            .chain(new_tolerations)
            .collect();
        prop_assert_eq!(&patched["spec"]["tolerations"], &Value::Array(expected));
    }

    /// Property: The patch is not idempotent; a second pass appends again.
    #[test]
    fn test_second_pass_duplicates(new_terms in terms()) {
        let cfg = config(Some(new_terms.clone()), None);
        let (_, once) = apply(&pod_with(None, None), &cfg);
        let (_, twice) = apply(&once, &cfg);

        let expected: Vec<Value> = new_terms.iter().chain(new_terms.iter()).cloned().collect();
        prop_assert_eq!(required_terms(&twice), &Value::Array(expected));
    }

    /// Property: A pod is excluded exactly when its labels contain every
    /// excluded pair.
    #[test]
    fn test_exclusion_is_subset_match(excluded in labels(), pod_labels in labels()) {
        let cfg = NamespaceConfig {
            excluded_labels: Some(excluded.clone()),
            ..Default::default()
        };
        let expected = !excluded.is_empty()
            && excluded.iter().all(|(k, v)| pod_labels.get(k) == Some(v));
        prop_assert_eq!(cfg.excludes(&pod_labels), expected);

        // Adding labels never un-excludes
        let mut superset = pod_labels.clone();
        superset.extend(excluded.clone());
        prop_assert_eq!(cfg.excludes(&superset), !excluded.is_empty());
    }

    /// Property: Serialized patches are deterministic.
    #[test]
    fn test_patch_bytes_deterministic(
        (affinity, _existing, _path) in affinity_shape(),
        new_terms in terms(),
        new_tolerations in tolerations()
    ) {
        let pod = pod_with(affinity, None);
        let cfg = config(Some(new_terms), Some(new_tolerations));
        let first = build_patch(&cfg, &pod_spec(&pod), &JsonPatchSerializer).unwrap();
        let second = build_patch(&cfg, &pod_spec(&pod), &JsonPatchSerializer).unwrap();
        prop_assert_eq!(first, second);
    }
}
