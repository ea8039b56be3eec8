//! Resource API Handlers
//!
//! Live view of the managed automation resources, normalized through the
//! per-kind readiness tables.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;

use crate::resources;
use crate::state::AppState;

/// Namespace the automation provisions into unless told otherwise.
const DEFAULT_NAMESPACE: &str = "ns-rosa-hcp";

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub namespace: Option<String>,
}

/// GET /api/resources
/// List watched resources in the namespace, normalized for display.
pub async fn list_resources(
    State(_state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let namespace = query.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    tracing::debug!("Listing resources in {}", namespace);

    let resources = resources::collect(namespace).await;
    Json(serde_json::json!({
        "namespace": namespace,
        "count": resources.len(),
        "resources": resources,
    }))
}
