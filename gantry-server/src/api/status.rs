//! Status API Handlers
//!
//! Read-path endpoints that need external truth: CLI auth state, hub
//! connectivity and vars-file completeness. Probe successes are served
//! through the TTL cache; probe failures surface as structured payloads
//! with HTTP 200, since "not logged in" is an answer, not a server error.

use axum::{Json, extract::State};
use serde_json::Value;

use crate::probes;
use crate::state::AppState;
use crate::vars::{UserVars, VarsError};

/// GET /api/status/auth
/// Cached CLI authentication status.
pub async fn auth_status(State(state): State<AppState>) -> Json<Value> {
    let result = state
        .cache
        .get_or_probe("cli-auth", state.config.auth_status_ttl, probes::cli_auth_status)
        .await;

    match result {
        Ok(payload) => Json(payload),
        Err(e) => Json(e.to_payload("authenticated")),
    }
}

/// GET /api/status/hub
/// Cached hub connection status.
pub async fn hub_status(State(state): State<AppState>) -> Json<Value> {
    let vars_path = state.config.vars_path();
    let result = state
        .cache
        .get_or_probe("hub-connection", state.config.hub_status_ttl, || {
            probes::hub_connection_status(&vars_path)
        })
        .await;

    match result {
        Ok(payload) => Json(payload),
        Err(e) => Json(e.to_payload("connected")),
    }
}

/// GET /api/status/config
/// Vars-file completeness report. Reads the file on every call; no probe
/// process is involved, so there is nothing worth caching.
pub async fn config_status(State(state): State<AppState>) -> Json<Value> {
    let report = match UserVars::load(&state.config.vars_path()) {
        Ok(vars) => vars.report(),
        Err(VarsError::Missing(path)) => {
            return Json(serde_json::json!({
                "configured": false,
                "status": "missing",
                "message": format!("vars file not found: {path}"),
                "suggestion": "Create the vars file from the template",
                "last_checked": chrono::Utc::now(),
            }));
        }
        Err(VarsError::InvalidYaml(detail)) => {
            return Json(serde_json::json!({
                "configured": false,
                "status": "invalid_yaml",
                "message": format!("Invalid YAML in vars file: {detail}"),
                "suggestion": "Fix the YAML syntax errors in the vars file",
                "last_checked": chrono::Utc::now(),
            }));
        }
        Err(e) => {
            return Json(serde_json::json!({
                "configured": false,
                "status": "error",
                "message": e.to_string(),
                "last_checked": chrono::Utc::now(),
            }));
        }
    };

    let mut payload = serde_json::to_value(&report).unwrap_or_default();
    if let Some(object) = payload.as_object_mut() {
        object.insert("last_checked".to_string(), serde_json::json!(chrono::Utc::now()));
    }
    Json(payload)
}
