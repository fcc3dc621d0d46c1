//! AdmissionReview wire format.
//!
//! The request is decoded loosely: only the uid, namespace and embedded
//! object are interpreted, every other field is carried through untouched so
//! the envelope can be echoed back with the response attached. This works for
//! both `admission.k8s.io/v1beta1` and `admission.k8s.io/v1`.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Patch type marker sent with every response
pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

/// Status reported for every mutated admission
pub const SUCCESS_STATUS: &str = "Success";

/// Audit annotation key recording the applied patch
pub const APPLIED_PATCH_ANNOTATION: &str = "namespace-node-affinity.io/applied-patch";

/// Admission review envelope
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// Admission request, as sent by the API server
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    /// Remaining request fields (kind, resource, operation, userInfo, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdmissionRequest {
    /// Target namespace, falling back to `default` when unset or empty
    pub fn namespace_or_default(&self) -> &str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => "default",
        }
    }
}

/// Status attached to the response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub status: String,
}

/// Admission response carrying the patch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<ByteString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub audit_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseStatus>,
}

impl AdmissionResponse {
    /// Always-allow response carrying `patch`
    pub fn with_patch(uid: &str, patch: Vec<u8>) -> Self {
        let applied = String::from_utf8_lossy(&patch).into_owned();
        Self {
            uid: uid.to_string(),
            allowed: true,
            patch: Some(ByteString(patch)),
            patch_type: Some(PATCH_TYPE_JSON_PATCH.to_string()),
            audit_annotations: BTreeMap::from([(APPLIED_PATCH_ANNOTATION.to_string(), applied)]),
            result: Some(ResponseStatus {
                status: SUCCESS_STATUS.to_string(),
            }),
        }
    }
}
