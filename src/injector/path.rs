//! Patch path resolution.
//!
//! JSON-Patch `add` fails when the parent of the target does not exist, so
//! the resolver finds the shallowest missing level of the scheduling chain
//! and the patch inserts exactly one subtree there.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::injector::pod::PodSpec;

pub const CREATE_AFFINITY: &str = "/spec/affinity";
pub const CREATE_NODE_AFFINITY: &str = "/spec/affinity/nodeAffinity";
pub const ADD_REQUIRED_DURING_SCHEDULING: &str =
    "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution";
pub const ADD_NODE_SELECTOR_TERMS: &str =
    "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms";
pub const APPEND_NODE_SELECTOR_TERMS: &str = "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms/-";
pub const CREATE_TOLERATIONS: &str = "/spec/tolerations";
pub const APPEND_TOLERATIONS: &str = "/spec/tolerations/-";

/// Insertion point for node selector terms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AffinityPath {
    /// `spec.affinity` is absent
    CreateAffinity,
    /// `affinity.nodeAffinity` is absent
    CreateNodeAffinity,
    /// `nodeAffinity.requiredDuringSchedulingIgnoredDuringExecution` is absent
    AddRequiredDuringScheduling,
    /// `nodeSelectorTerms` is unset
    AddNodeSelectorTerms,
    /// `nodeSelectorTerms` exists, possibly empty
    AppendNodeSelectorTerms,
}

impl AffinityPath {
    pub const ALL: [AffinityPath; 5] = [
        AffinityPath::CreateAffinity,
        AffinityPath::CreateNodeAffinity,
        AffinityPath::AddRequiredDuringScheduling,
        AffinityPath::AddNodeSelectorTerms,
        AffinityPath::AppendNodeSelectorTerms,
    ];

    /// JSON pointer for this insertion point
    pub fn as_str(&self) -> &'static str {
        match self {
            AffinityPath::CreateAffinity => CREATE_AFFINITY,
            AffinityPath::CreateNodeAffinity => CREATE_NODE_AFFINITY,
            AffinityPath::AddRequiredDuringScheduling => ADD_REQUIRED_DURING_SCHEDULING,
            AffinityPath::AddNodeSelectorTerms => ADD_NODE_SELECTOR_TERMS,
            AffinityPath::AppendNodeSelectorTerms => APPEND_NODE_SELECTOR_TERMS,
        }
    }

    /// Whether this path appends single elements to an existing array
    pub fn is_append(&self) -> bool {
        matches!(self, AffinityPath::AppendNodeSelectorTerms)
    }
}

impl fmt::Display for AffinityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AffinityPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AffinityPath::ALL
            .into_iter()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| Error::FailedToCreatePatch(format!("invalid affinity patch path {s:?}")))
    }
}

/// Insertion point for tolerations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TolerationsPath {
    /// `spec.tolerations` is absent
    CreateTolerations,
    /// `spec.tolerations` exists, possibly empty
    AppendTolerations,
}

impl TolerationsPath {
    pub const ALL: [TolerationsPath; 2] = [
        TolerationsPath::CreateTolerations,
        TolerationsPath::AppendTolerations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TolerationsPath::CreateTolerations => CREATE_TOLERATIONS,
            TolerationsPath::AppendTolerations => APPEND_TOLERATIONS,
        }
    }

    pub fn is_append(&self) -> bool {
        matches!(self, TolerationsPath::AppendTolerations)
    }
}

impl fmt::Display for TolerationsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TolerationsPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TolerationsPath::ALL
            .into_iter()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| {
                Error::FailedToCreatePatch(format!("invalid tolerations patch path {s:?}"))
            })
    }
}

/// Resolve where node selector terms must be inserted for this pod spec
pub fn resolve_affinity_path(spec: &PodSpec) -> AffinityPath {
    let Some(affinity) = &spec.affinity else {
        return AffinityPath::CreateAffinity;
    };
    let Some(node_affinity) = &affinity.node_affinity else {
        return AffinityPath::CreateNodeAffinity;
    };
    let Some(required) = &node_affinity.required_during_scheduling_ignored_during_execution else {
        return AffinityPath::AddRequiredDuringScheduling;
    };
    match required.node_selector_terms {
        None => AffinityPath::AddNodeSelectorTerms,
        Some(_) => AffinityPath::AppendNodeSelectorTerms,
    }
}

/// Resolve where tolerations must be inserted for this pod spec
pub fn resolve_tolerations_path(spec: &PodSpec) -> TolerationsPath {
    match spec.tolerations {
        None => TolerationsPath::CreateTolerations,
        Some(_) => TolerationsPath::AppendTolerations,
    }
}
