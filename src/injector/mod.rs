//! Admission mutation engine.
//!
//! Decodes an AdmissionReview, resolves the namespace policy, and answers
//! with a JSON patch grafting node affinity and tolerations onto the pod.
//! Admission is always allowed; errors are returned to the HTTP layer.

pub mod config;
pub mod patch;
pub mod path;
pub mod pod;
pub mod review;
pub mod source;

pub use config::NamespaceConfig;
pub use patch::{JsonPatchSerializer, PatchSerializer, build_patch};
pub use path::{AffinityPath, TolerationsPath, resolve_affinity_path, resolve_tolerations_path};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
pub use source::{
    ConfigMapStore, FixedKeySource, KubeConfigMapStore, NamespaceKeyedSource, PolicySource,
};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use pod::Pod;

/// Outcome of a successful mutation call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// The review carried no request; nothing to answer
    Skipped,
    /// The pod matched the exclusion labels; the input is returned as-is
    Excluded(Vec<u8>),
    /// The review with a patch response attached
    Patched(Vec<u8>),
}

impl Mutation {
    /// Response body, `None` for a request-less review
    pub fn into_body(self) -> Option<Vec<u8>> {
        match self {
            Mutation::Skipped => None,
            Mutation::Excluded(body) | Mutation::Patched(body) => Some(body),
        }
    }

    /// Metrics label for this outcome
    pub fn outcome(&self) -> &'static str {
        match self {
            Mutation::Skipped => "skipped",
            Mutation::Excluded(_) => "excluded",
            Mutation::Patched(_) => "mutated",
        }
    }
}

/// Handles AdmissionReview bodies
pub struct Injector {
    source: Box<dyn PolicySource>,
    serializer: Box<dyn PatchSerializer>,
}

impl Injector {
    /// Create an injector reading policy from `source`
    pub fn new(source: impl PolicySource + 'static) -> Self {
        Self::with_serializer(source, JsonPatchSerializer)
    }

    /// Create an injector with a custom patch serializer
    pub fn with_serializer(
        source: impl PolicySource + 'static,
        serializer: impl PatchSerializer + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            serializer: Box::new(serializer),
        }
    }

    /// Mutate an AdmissionReview body.
    ///
    /// Returns `Ok(None)` for a review without a request, the unmodified
    /// body for excluded pods, and the patched review otherwise.
    pub async fn mutate(&self, body: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.review(body).await?.into_body())
    }

    /// Like [`Injector::mutate`] but keeps the outcome kind
    pub async fn review(&self, body: &[u8]) -> Result<Mutation> {
        let mut review: AdmissionReview =
            serde_json::from_slice(body).map_err(Error::InvalidAdmissionReview)?;

        let Some(request) = review.request.as_ref() else {
            warn!("AdmissionReview with empty request");
            return Ok(Mutation::Skipped);
        };

        let pod = decode_pod(request)?;
        let namespace = request.namespace_or_default();
        debug!(uid = %request.uid, namespace = %namespace, "Processing admission request");

        let config = self.source.namespace_config(namespace).await?;

        if config.excludes(pod.labels()) {
            info!(
                uid = %request.uid,
                namespace = %namespace,
                labels = ?pod.labels(),
                "Ignoring pod with excluded labels"
            );
            return Ok(Mutation::Excluded(body.to_vec()));
        }

        let patch = build_patch(&config, &pod.spec(), self.serializer.as_ref())?;
        info!(
            uid = %request.uid,
            namespace = %namespace,
            patch = %String::from_utf8_lossy(&patch),
            "Admission request patched"
        );
        let response = AdmissionResponse::with_patch(&request.uid, patch);

        review.response = Some(response);
        Ok(Mutation::Patched(serde_json::to_vec(&review)?))
    }
}

fn decode_pod(request: &AdmissionRequest) -> Result<Pod> {
    let object = request.object.as_ref().ok_or_else(|| {
        Error::InvalidAdmissionReviewObject("request carries no object".to_string())
    })?;
    Pod::deserialize(object).map_err(|e| Error::InvalidAdmissionReviewObject(e.to_string()))
}
