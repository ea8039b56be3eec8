//! Cluster resource collector
//!
//! Lists the watched automation resource types from the target cluster
//! and maps each item through the readiness normalizer. Every type is
//! fetched independently; a missing CRD or a slow API server skips that
//! type instead of failing the whole listing.

use std::process::Stdio;
use std::time::Duration;

use gantry_core::domain::resource::{self, Condition, NormalizedResource};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resource types surfaced in the live-resources view: kubectl resource
/// name plus the kind used for readiness lookup.
const WATCHED_TYPES: &[(&str, &str)] = &[
    ("clusters.cluster.x-k8s.io", "Cluster"),
    ("rosacluster", "ROSACluster"),
    ("rosacontrolplane", "ROSAControlPlane"),
    ("rosanetwork", "ROSANetwork"),
    ("rosaroleconfig", "ROSARoleConfig"),
];

/// Fetches and normalizes all watched resources in `namespace`.
pub async fn collect(namespace: &str) -> Vec<NormalizedResource> {
    let mut resources = Vec::new();
    for (resource_name, kind) in WATCHED_TYPES {
        match fetch_items(resource_name, namespace).await {
            Ok(items) => {
                resources.extend(items.iter().map(|item| normalize_item(kind, item)));
            }
            Err(e) => {
                // Typically the CRD is not installed on this cluster.
                debug!("Skipping {}: {}", resource_name, e);
            }
        }
    }
    resources
}

async fn fetch_items(resource_name: &str, namespace: &str) -> Result<Vec<Value>, String> {
    let child = Command::new("kubectl")
        .args(["get", resource_name, "-n", namespace, "-o", "json"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to launch kubectl: {e}"))?;

    let output = tokio::time::timeout(FETCH_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("kubectl get {resource_name} timed out"))?
        .map_err(|e| format!("kubectl did not finish: {e}"))?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }

    let listing: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| format!("unparseable kubectl output: {e}"))?;
    Ok(listing
        .get("items")
        .and_then(|items| items.as_array())
        .cloned()
        .unwrap_or_default())
}

/// Maps one raw resource object into the normalized view. Pure.
fn normalize_item(kind: &str, item: &Value) -> NormalizedResource {
    let metadata = item.get("metadata");
    let spec = item.get("spec");
    let status = item.get("status");

    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown")
        .to_string();
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());
    let version = spec
        .and_then(|s| s.get("version"))
        .or_else(|| spec.and_then(|s| s.get("topology")).and_then(|t| t.get("version")))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    // `ready` drifted between a real boolean and the string "true".
    let ready_field = status.and_then(|s| s.get("ready")).and_then(|r| match r {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s == "true"),
        _ => None,
    });
    let conditions: Vec<Condition> = status
        .and_then(|s| s.get("conditions"))
        .and_then(|c| serde_json::from_value(c.clone()).ok())
        .unwrap_or_default();

    let age = metadata
        .and_then(|m| m.get("creationTimestamp"))
        .and_then(|t| t.as_str())
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map(|created| resource::format_age(chrono::Utc::now().signed_duration_since(created)))
        .unwrap_or_else(|| {
            warn!("{} {} has no parseable creationTimestamp", kind, name);
            "unknown".to_string()
        });

    NormalizedResource {
        kind: kind.to_string(),
        name,
        namespace,
        version,
        age,
        status: resource::readiness(kind, ready_field, &conditions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::resource::ResourceStatus;
    use serde_json::json;

    #[test]
    fn test_normalize_item_with_conditions() {
        let item = json!({
            "metadata": {
                "name": "stage-net",
                "namespace": "ns-rosa-hcp",
                "creationTimestamp": "2020-01-01T00:00:00Z",
            },
            "spec": {"version": "4.20.0"},
            "status": {
                "conditions": [
                    {"type": "Progressing", "status": "True"},
                    {"type": "RosaNetworkReady", "status": "True", "reason": "AllSubnetsReady"},
                ],
            },
        });

        let normalized = normalize_item("ROSANetwork", &item);
        assert_eq!(normalized.name, "stage-net");
        assert_eq!(normalized.namespace.as_deref(), Some("ns-rosa-hcp"));
        assert_eq!(normalized.version, "4.20.0");
        assert_eq!(normalized.status, ResourceStatus::Ready);
        assert!(normalized.age.ends_with('h'), "coarse age, got {}", normalized.age);
    }

    #[test]
    fn test_normalize_item_with_stringly_ready_field() {
        let item = json!({
            "metadata": {"name": "cp", "creationTimestamp": "2020-01-01T00:00:00Z"},
            "status": {"ready": "true"},
        });
        let normalized = normalize_item("ROSAControlPlane", &item);
        assert_eq!(normalized.status, ResourceStatus::Ready);
        assert_eq!(normalized.version, "unknown");
    }

    #[test]
    fn test_normalize_item_without_signals_uses_default() {
        let item = json!({
            "metadata": {"name": "fresh", "creationTimestamp": "2020-01-01T00:00:00Z"},
            "status": {},
        });
        assert_eq!(
            normalize_item("ROSACluster", &item).status,
            ResourceStatus::Provisioning
        );
        assert_eq!(
            normalize_item("ROSARoleConfig", &item).status,
            ResourceStatus::Configuring
        );
    }

    #[test]
    fn test_normalize_item_topology_version_fallback() {
        let item = json!({
            "metadata": {"name": "capi", "creationTimestamp": "2020-01-01T00:00:00Z"},
            "spec": {"topology": {"version": "v1.5.3"}},
        });
        assert_eq!(normalize_item("Cluster", &item).version, "v1.5.3");
    }

    #[test]
    fn test_normalize_item_missing_timestamp() {
        let item = json!({"metadata": {"name": "odd"}});
        assert_eq!(normalize_item("Cluster", &item).age, "unknown");
    }
}
