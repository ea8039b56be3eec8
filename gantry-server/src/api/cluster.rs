//! Cluster API Handlers
//!
//! Provision and tear down clusters through the automation playbooks.
//! Both endpoints are thin command producers: they choose the playbook,
//! pass the cluster parameters as extra vars and register a job.

use axum::{
    Json,
    extract::{Path, State},
};
use gantry_core::domain::job::{JobKind, JobStatus};
use gantry_core::dto::job::CreateCluster;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::job::{creation_metadata, ensure_kubeconfig};
use crate::runner::{self, CommandSpec, TIMEOUT_PLAYBOOK};
use crate::state::AppState;

/// Playbook run when network automation is requested (VPC and subnets
/// are provisioned by the automation itself).
const PLAYBOOK_ENV_SETUP: &str = "acm21174_environment_setup.yaml";
const PLAYBOOK_CREATE: &str = "create_rosa_hcp_cluster.yaml";
const PLAYBOOK_DELETE: &str = "delete_rosa_hcp_cluster.yaml";

#[derive(Debug, Serialize)]
pub struct ClusterJobCreated {
    pub cluster_name: String,
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// POST /api/clusters
/// Create a cluster via the automation playbooks.
pub async fn create_cluster(
    State(state): State<AppState>,
    Json(req): Json<CreateCluster>,
) -> ApiResult<Json<ClusterJobCreated>> {
    validate_cluster_name(&req.name)?;

    let playbook = if req.network_automation {
        PLAYBOOK_ENV_SETUP
    } else {
        PLAYBOOK_CREATE
    };

    tracing::info!("Creating cluster {} via {}", req.name, playbook);

    let mut spec = CommandSpec::new("ansible-playbook")
        .arg(playbook)
        .extra_var("cluster_name", &req.name)
        .extra_var("openshift_version", &req.version)
        .extra_var("aws_region", &req.region)
        .extra_var("skip_ansible_runner", "true")
        .cwd(&state.config.project_root)
        .timeout(TIMEOUT_PLAYBOOK);
    if req.network_automation {
        spec = spec.extra_var("enable_network_automation", "true");
    }
    if req.role_automation {
        spec = spec.extra_var("enable_role_automation", "true");
    }
    spec = ensure_kubeconfig(spec);

    let metadata = creation_metadata(&[
        ("cluster_name", req.name.as_str()),
        ("playbook", playbook),
        ("description", "Cluster creation"),
    ]);

    let job_id = state.store.create(JobKind::Playbook, metadata);
    runner::spawn(state.store.clone(), job_id, spec);

    Ok(Json(ClusterJobCreated {
        cluster_name: req.name,
        job_id,
        status: JobStatus::Pending,
        message: "Cluster creation started".to_string(),
    }))
}

/// DELETE /api/clusters/{name}
/// Tear a cluster down via the deletion playbook.
pub async fn delete_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ClusterJobCreated>> {
    validate_cluster_name(&name)?;

    tracing::info!("Deleting cluster {}", name);

    let spec = ensure_kubeconfig(
        CommandSpec::new("ansible-playbook")
            .arg(PLAYBOOK_DELETE)
            .extra_var("cluster_name", &name)
            .extra_var("skip_ansible_runner", "true")
            .cwd(&state.config.project_root)
            .timeout(TIMEOUT_PLAYBOOK),
    );

    let metadata = creation_metadata(&[
        ("cluster_name", name.as_str()),
        ("playbook", PLAYBOOK_DELETE),
        ("description", "Cluster deletion"),
    ]);

    let job_id = state.store.create(JobKind::Deletion, metadata);
    runner::spawn(state.store.clone(), job_id, spec);

    Ok(Json(ClusterJobCreated {
        cluster_name: name,
        job_id,
        status: JobStatus::Pending,
        message: "Cluster deletion started".to_string(),
    }))
}

/// Kubernetes object naming rules: lowercase alphanumerics and hyphens,
/// starting and ending alphanumeric.
fn validate_cluster_name(name: &str) -> Result<(), ApiError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Invalid cluster name: use lowercase letters, digits and hyphens, starting and ending with an alphanumeric character".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cluster_name() {
        assert!(validate_cluster_name("rosa-stage-1").is_ok());
        assert!(validate_cluster_name("a").is_ok());

        assert!(validate_cluster_name("").is_err());
        assert!(validate_cluster_name("-leading").is_err());
        assert!(validate_cluster_name("trailing-").is_err());
        assert!(validate_cluster_name("Upper").is_err());
        assert!(validate_cluster_name("under_score").is_err());
        assert!(validate_cluster_name(&"x".repeat(64)).is_err());
    }
}
