//! Manifest API Handlers
//!
//! Accepts a raw multi-document YAML manifest, splits it into documents
//! with their routing fields (kind, name, namespace) and hands the
//! ordered sequence to the apply job.

use std::sync::Arc;

use axum::{Json, extract::State};
use gantry_core::domain::document::Document;
use gantry_core::domain::job::JobKind;
use gantry_core::dto::job::{ApplyManifest, JobCreated};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::job::creation_metadata;
use crate::apply::{self, KubectlBackend};
use crate::state::AppState;

/// POST /api/manifests/apply
/// Apply a multi-document manifest as a background job.
pub async fn apply_manifests(
    State(state): State<AppState>,
    Json(req): Json<ApplyManifest>,
) -> ApiResult<Json<JobCreated>> {
    let documents = parse_documents(&req.manifest, req.namespace.as_deref())
        .map_err(ApiError::BadRequest)?;

    tracing::info!("Launching apply job for {} document(s)", documents.len());

    let metadata = creation_metadata(&[
        ("document_count", &documents.len().to_string()),
        ("description", "Applying manifest documents"),
    ]);

    let job_id = state.store.create(JobKind::MultiDocumentApply, metadata);
    apply::spawn(
        state.store.clone(),
        job_id,
        documents,
        Arc::new(KubectlBackend::new()),
    );

    Ok(Json(JobCreated::new(job_id, "Manifest apply started")))
}

/// Minimal manifest structure needed for routing; everything else stays
/// opaque in the payload.
#[derive(Debug, Deserialize)]
struct ManifestHeader {
    kind: String,
    metadata: ManifestMetadata,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// Splits a multi-document YAML manifest into ordered documents. Empty
/// documents (stray separators, comments only) are dropped; a document
/// without kind/name is a hard error naming its position.
pub(crate) fn parse_documents(
    manifest: &str,
    default_namespace: Option<&str>,
) -> Result<Vec<Document>, String> {
    if manifest.trim().is_empty() {
        return Err("manifest is required".to_string());
    }

    let mut documents = Vec::new();
    for (index, raw) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let value = serde_yaml::Value::deserialize(raw)
            .map_err(|e| format!("invalid YAML in document {}: {}", index + 1, e))?;
        if value.is_null() {
            continue;
        }

        let header: ManifestHeader = serde_yaml::from_value(value.clone())
            .map_err(|e| format!("document {} is missing kind or metadata.name: {}", index + 1, e))?;
        let payload = serde_yaml::to_string(&value)
            .map_err(|e| format!("failed to re-serialize document {}: {}", index + 1, e))?;

        documents.push(Document {
            kind: header.kind,
            name: header.metadata.name,
            namespace: header
                .metadata
                .namespace
                .or_else(|| default_namespace.map(|s| s.to_string())),
            payload,
        });
    }

    if documents.is_empty() {
        return Err("manifest contains no documents".to_string());
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
apiVersion: v1
kind: Namespace
metadata:
  name: ns-rosa-hcp
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: cluster-settings
  namespace: ns-rosa-hcp
data:
  region: us-west-2
";

    #[test]
    fn test_parse_documents_in_order() {
        let documents = parse_documents(MANIFEST, None).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].kind, "Namespace");
        assert_eq!(documents[0].name, "ns-rosa-hcp");
        assert_eq!(documents[0].namespace, None);
        assert_eq!(documents[1].kind, "ConfigMap");
        assert_eq!(documents[1].namespace.as_deref(), Some("ns-rosa-hcp"));
        assert!(documents[1].payload.contains("region: us-west-2"));
    }

    #[test]
    fn test_default_namespace_fills_gaps_only() {
        let manifest = "\
kind: ConfigMap
metadata:
  name: floating
";
        let documents = parse_documents(manifest, Some("fallback")).unwrap();
        assert_eq!(documents[0].namespace.as_deref(), Some("fallback"));

        let documents = parse_documents(MANIFEST, Some("fallback")).unwrap();
        assert_eq!(documents[1].namespace.as_deref(), Some("ns-rosa-hcp"));
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        assert!(parse_documents("", None).is_err());
        assert!(parse_documents("   \n", None).is_err());
        assert!(parse_documents("---\n---\n", None).is_err());
    }

    #[test]
    fn test_document_without_name_is_an_error() {
        let manifest = "kind: ConfigMap\nmetadata: {}\n";
        let err = parse_documents(manifest, None).unwrap_err();
        assert!(err.contains("document 1"));
    }

    #[test]
    fn test_stray_separator_is_skipped() {
        let manifest = format!("---\n{MANIFEST}");
        assert_eq!(parse_documents(&manifest, None).unwrap().len(), 2);
    }
}
