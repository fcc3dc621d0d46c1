//! Patches applied to every pod scheduling shape.
//!
//! The API server applies the operations of a patch one after the other, so
//! these tests apply them the same way and inspect the resulting pod.

use namespace_node_affinity::Injector;
use serde_json::{Value, json};

use crate::common::fixtures::{
    AdmissionReviewBuilder, PodBuilder, apply_response, required_terms, response_patch, term,
    toleration,
};
use crate::scenario_tests::{keyed_injector, keyed_store};

fn two_term_injector() -> Injector {
    keyed_injector(keyed_store(&[(
        "test-ns",
        json!({"nodeSelectorTerms": [term("first", "1"), term("second", "2")]}),
    )]))
}

async fn mutate_and_apply(injector: &Injector, pod: &Value) -> (Value, Value) {
    let body = AdmissionReviewBuilder::new(pod.clone())
        .namespace("test-ns")
        .build();
    let mutated = injector.mutate(&body).await.unwrap().unwrap();
    let patch = serde_json::to_value(response_patch(&mutated)).unwrap();
    (patch, apply_response(&mutated, pod))
}

/// `affinity` present with only `podAffinity`: the sibling survives.
#[tokio::test]
async fn test_missing_node_affinity_keeps_pod_affinity() {
    let pod_affinity = json!({"requiredDuringSchedulingIgnoredDuringExecution": [
        {"labelSelector": {"matchLabels": {"app": "cache"}}, "topologyKey": "kubernetes.io/hostname"}
    ]});
    let pod = PodBuilder::new("web")
        .affinity(json!({"podAffinity": pod_affinity}))
        .build();

    let (patch, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(patch.as_array().map(Vec::len), Some(1));
    assert_eq!(patch[0]["path"], "/spec/affinity/nodeAffinity");

    assert_eq!(patched["spec"]["affinity"]["podAffinity"], pod_affinity);
    assert_eq!(
        required_terms(&patched),
        &json!([term("first", "1"), term("second", "2")])
    );
}

/// `nodeAffinity` with only preferred terms: they survive.
#[tokio::test]
async fn test_missing_required_keeps_preferred() {
    let preferred = json!([{"weight": 1, "preference": term("disk", "ssd")}]);
    let pod = PodBuilder::new("web")
        .affinity(json!({"nodeAffinity": {
            "preferredDuringSchedulingIgnoredDuringExecution": preferred
        }}))
        .build();

    let (patch, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(
        patch[0]["path"],
        "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution"
    );
    assert_eq!(
        patched["spec"]["affinity"]["nodeAffinity"]["preferredDuringSchedulingIgnoredDuringExecution"],
        preferred
    );
    assert_eq!(
        required_terms(&patched),
        &json!([term("first", "1"), term("second", "2")])
    );
}

/// Required selector present without a terms array.
#[tokio::test]
async fn test_required_without_terms() {
    let pod = PodBuilder::new("web")
        .affinity(json!({"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {}}}))
        .build();

    let (patch, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(patch.as_array().map(Vec::len), Some(1));
    assert_eq!(
        patch[0]["path"],
        "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms"
    );
    assert_eq!(
        required_terms(&patched),
        &json!([term("first", "1"), term("second", "2")])
    );
}

/// Present but empty terms array: appended one at a time.
#[tokio::test]
async fn test_empty_terms_array_is_appended() {
    let pod = PodBuilder::new("web").node_selector_terms(vec![]).build();

    let (patch, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(patch.as_array().map(Vec::len), Some(2));
    assert!(
        patch
            .as_array()
            .unwrap()
            .iter()
            .all(|op| op["path"].as_str().is_some_and(|p| p.ends_with("/-")))
    );
    assert_eq!(
        required_terms(&patched),
        &json!([term("first", "1"), term("second", "2")])
    );
}

/// Existing terms stay first; input order is kept.
#[tokio::test]
async fn test_append_keeps_existing_terms_first() {
    let pod = PodBuilder::new("web")
        .node_selector_terms(vec![term("a", "x"), term("b", "y")])
        .build();

    let (_, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(
        required_terms(&patched),
        &json!([
            term("a", "x"),
            term("b", "y"),
            term("first", "1"),
            term("second", "2")
        ])
    );
}

/// Tolerations: absent is created, empty is appended to.
#[tokio::test]
async fn test_tolerations_create_and_append() {
    let injector = keyed_injector(keyed_store(&[(
        "test-ns",
        json!({"tolerations": [toleration("a"), toleration("b")]}),
    )]));

    let (patch, patched) = mutate_and_apply(&injector, &PodBuilder::new("web").build()).await;
    assert_eq!(patch.as_array().map(Vec::len), Some(1));
    assert_eq!(patch[0]["path"], "/spec/tolerations");
    assert_eq!(
        patched["spec"]["tolerations"],
        json!([toleration("a"), toleration("b")])
    );

    let pod = PodBuilder::new("web").tolerations(vec![]).build();
    let (patch, patched) = mutate_and_apply(&injector, &pod).await;
    assert_eq!(patch.as_array().map(Vec::len), Some(2));
    assert_eq!(patch[0]["path"], "/spec/tolerations/-");
    assert_eq!(
        patched["spec"]["tolerations"],
        json!([toleration("a"), toleration("b")])
    );
}

/// Fields the engine does not inspect pass through the patch untouched.
#[tokio::test]
async fn test_unrelated_pod_fields_are_untouched() {
    let mut pod = PodBuilder::new("web").label("app", "web").build();
    pod["spec"]["nodeSelector"] = json!({"kubernetes.io/os": "linux"});
    pod["spec"]["priorityClassName"] = json!("high");

    let (_, patched) = mutate_and_apply(&two_term_injector(), &pod).await;
    assert_eq!(patched["metadata"], pod["metadata"]);
    assert_eq!(patched["spec"]["containers"], pod["spec"]["containers"]);
    assert_eq!(patched["spec"]["nodeSelector"], pod["spec"]["nodeSelector"]);
    assert_eq!(patched["spec"]["priorityClassName"], "high");
}
