//! Manifest document types

use serde::{Deserialize, Serialize};

/// One declarative resource document out of a multi-document manifest.
///
/// The payload is treated as opaque by the orchestration core; only the
/// routing fields (kind, name, namespace) are inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    /// Serialized single-document manifest, handed verbatim to the apply
    /// backend.
    pub payload: String,
}

impl Document {
    /// "kind/name" label used in log lines and error messages.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    /// Whether applying this document brings a new namespace boundary into
    /// existence (its own namespace, or a managed-cluster namespace created
    /// by the hub on registration).
    pub fn provisions_namespace(&self) -> bool {
        self.kind.eq_ignore_ascii_case("Namespace") || self.kind.eq_ignore_ascii_case("ManagedCluster")
    }
}
