//! Error types for the admission mutation engine.
//!
//! Every variant is terminal for the request that produced it. Callers tell
//! kinds apart by matching on the variant, never by inspecting the message.

use thiserror::Error;

/// Error type for admission mutation
#[derive(Error, Debug)]
pub enum Error {
    /// The AdmissionReview envelope could not be decoded
    #[error("invalid admission review: {0}")]
    InvalidAdmissionReview(#[source] serde_json::Error),

    /// The object embedded in the admission request could not be decoded
    #[error("invalid admission review object: {0}")]
    InvalidAdmissionReviewObject(String),

    /// No policy exists for the namespace
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// A policy exists but is malformed or has no effect
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The patch path was unrecognised or the patch could not be serialized
    #[error("failed to create patch: {0}")]
    FailedToCreatePatch(String),

    /// The response envelope could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Check if this error indicates the object already exists
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 409)
    }

    /// Short, stable tag for the error kind, used as a metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InvalidAdmissionReview(_) => "InvalidAdmissionReview",
            Error::InvalidAdmissionReviewObject(_) => "InvalidAdmissionReviewObject",
            Error::MissingConfiguration(_) => "MissingConfiguration",
            Error::InvalidConfiguration(_) => "InvalidConfiguration",
            Error::FailedToCreatePatch(_) => "FailedToCreatePatch",
            Error::Serialization(_) => "Serialization",
            Error::Kube(_) => "Kube",
        }
    }
}

/// Result type alias for admission mutation
pub type Result<T> = std::result::Result<T, Error>;
