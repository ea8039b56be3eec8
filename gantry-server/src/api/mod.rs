//! API Module
//!
//! HTTP and WebSocket API layer. Each submodule handles endpoints for a
//! specific domain.

pub mod cluster;
pub mod error;
pub mod health;
pub mod job;
pub mod manifest;
pub mod resource;
pub mod status;
pub mod ws;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Cluster lifecycle
        .route("/api/clusters", post(cluster::create_cluster))
        .route("/api/clusters/{name}", delete(cluster::delete_cluster))
        // Automation entry points
        .route("/api/playbooks/run", post(job::run_playbook))
        .route("/api/tasks/run", post(job::run_task))
        .route("/api/roles/run", post(job::run_role))
        .route("/api/manifests/apply", post(manifest::apply_manifests))
        // Job endpoints
        .route("/api/jobs", get(job::list_jobs))
        .route("/api/jobs", delete(job::clear_jobs))
        .route("/api/jobs/{id}", get(job::get_job))
        .route("/api/jobs/{id}/logs", get(job::get_job_logs))
        // External status probes
        .route("/api/status/auth", get(status::auth_status))
        .route("/api/status/hub", get(status::hub_status))
        .route("/api/status/config", get(status::config_status))
        // Live resources
        .route("/api/resources", get(resource::list_resources))
        // WebSocket job updates
        .route("/ws/jobs/{id}", get(ws::job_updates))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
