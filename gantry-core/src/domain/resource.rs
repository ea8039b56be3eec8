//! Resource readiness model
//!
//! Managed resources report readiness through a mix of a direct `ready`
//! field and condition lists whose type names drifted across API versions
//! (`Ready`, `ROSAClusterReady`, `RosaClusterReady`, ...). This module
//! normalizes all of that into one status enum via a per-kind alias table.

use serde::{Deserialize, Serialize};

/// A structured readiness signal from a resource's status block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Kubernetes-style tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Uniform status a resource normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Ready,
    Provisioning,
    Configuring,
    Unknown,
}

/// Normalized view of one managed resource, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResource {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub version: String,
    /// Coarse human-readable duration since creation, e.g. "3d7h".
    pub age: String,
    pub status: ResourceStatus,
}

/// Per-kind readiness vocabulary: accepted "ready" condition-type synonyms
/// and the label shown while no positive signal exists. Kind match is
/// case-insensitive; unknown kinds fall through to `Ready`-only with an
/// Unknown default.
const KIND_TABLE: &[(&str, &[&str], ResourceStatus)] = &[
    ("cluster", &["Ready"], ResourceStatus::Provisioning),
    (
        "rosacluster",
        &["Ready", "ROSAClusterReady", "RosaClusterReady"],
        ResourceStatus::Provisioning,
    ),
    (
        "rosacontrolplane",
        &["Ready", "ROSAControlPlaneReady", "RosaControlPlaneReady"],
        ResourceStatus::Provisioning,
    ),
    (
        "rosanetwork",
        &["ROSANetworkReady", "RosaNetworkReady", "Ready"],
        ResourceStatus::Configuring,
    ),
    (
        "rosaroleconfig",
        &["ROSARoleConfigReady", "RosaRoleConfigReady", "Ready"],
        ResourceStatus::Configuring,
    ),
];

/// Fallback for kinds outside the table.
const UNKNOWN_KIND_ALIASES: &[&str] = &["Ready"];

fn kind_entry(kind: &str) -> (&'static [&'static str], ResourceStatus) {
    let lowered = kind.to_ascii_lowercase();
    KIND_TABLE
        .iter()
        .find(|(k, _, _)| *k == lowered)
        .map(|(_, aliases, default)| (*aliases, *default))
        .unwrap_or((UNKNOWN_KIND_ALIASES, ResourceStatus::Unknown))
}

/// Normalizes a resource's readiness signals into one status.
///
/// A direct `ready: true` field wins outright. Otherwise the condition
/// list is scanned once in order and the first True condition whose type
/// is in the kind's alias set wins; there is no conflict resolution
/// beyond list order. With no positive signal, the kind's default
/// non-ready label is returned.
pub fn readiness(kind: &str, ready_field: Option<bool>, conditions: &[Condition]) -> ResourceStatus {
    if ready_field == Some(true) {
        return ResourceStatus::Ready;
    }

    let (aliases, default) = kind_entry(kind);
    for condition in conditions {
        if condition.status == ConditionStatus::True
            && aliases.iter().any(|a| *a == condition.condition_type)
        {
            return ResourceStatus::Ready;
        }
    }

    default
}

/// Formats an age at the coarsest applicable unit: "3d7h", "7h42m",
/// "42m10s", "10s". Negative durations clamp to "0s".
pub fn format_age(age: chrono::Duration) -> String {
    let total = age.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
