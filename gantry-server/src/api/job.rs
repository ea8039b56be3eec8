//! Job API Handlers
//!
//! HTTP endpoints for creating, inspecting and clearing jobs. Creation
//! endpoints validate their inputs, register a pending job and hand the
//! command to the background runner; they respond with the job id without
//! waiting on execution.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use gantry_core::domain::job::{Job, JobKind};
use gantry_core::dto::job::{JobCreated, JobLogs, RunPlaybook, RunRole, RunTask};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::runner::{self, CommandSpec, TIMEOUT_PLAYBOOK, TIMEOUT_ROLE, TIMEOUT_TASK};
use crate::state::AppState;

/// POST /api/playbooks/run
/// Run an existing automation playbook as a background job.
pub async fn run_playbook(
    State(state): State<AppState>,
    Json(req): Json<RunPlaybook>,
) -> ApiResult<Json<JobCreated>> {
    if req.playbook.trim().is_empty() {
        return Err(ApiError::BadRequest("playbook is required".to_string()));
    }

    let playbook_path = state.config.project_root.join(&req.playbook);
    if !playbook_path.exists() {
        return Err(ApiError::NotFound(format!("Playbook not found: {}", req.playbook)));
    }

    tracing::info!("Launching playbook job: {}", req.playbook);

    let mut spec = CommandSpec::new("ansible-playbook")
        .arg(playbook_path.display().to_string())
        .arg("-v")
        .cwd(&state.config.project_root)
        .timeout(TIMEOUT_PLAYBOOK);
    for (key, value) in &req.extra_vars {
        spec = spec.extra_var(key, value);
    }
    spec = ensure_kubeconfig(spec);

    let metadata = creation_metadata(&[
        ("playbook", req.playbook.as_str()),
        ("description", req.description.as_deref().unwrap_or("Running playbook")),
    ]);

    let job_id = state.store.create(JobKind::Playbook, metadata);
    runner::spawn(state.store.clone(), job_id, spec);

    Ok(Json(JobCreated::new(job_id, "Playbook execution started")))
}

/// POST /api/tasks/run
/// Run a single task file as an ad-hoc background job.
pub async fn run_task(
    State(state): State<AppState>,
    Json(req): Json<RunTask>,
) -> ApiResult<Json<JobCreated>> {
    if req.task_file.trim().is_empty() {
        return Err(ApiError::BadRequest("task_file is required".to_string()));
    }

    let task_path = state.config.project_root.join(&req.task_file);
    if !task_path.exists() {
        return Err(ApiError::NotFound(format!("Task file not found: {}", req.task_file)));
    }

    tracing::info!("Launching task job: {}", req.task_file);

    let spec = ensure_kubeconfig(
        CommandSpec::new("ansible")
            .args(["localhost", "-c", "local", "-m", "include_tasks"])
            .arg("-a")
            .arg(format!("file={}", req.task_file))
            .extra_var("skip_ansible_runner", "true")
            .cwd(&state.config.project_root)
            .timeout(TIMEOUT_TASK),
    );

    let metadata = creation_metadata(&[
        ("task_file", req.task_file.as_str()),
        ("description", req.description.as_deref().unwrap_or("Running task")),
    ]);

    let job_id = state.store.create(JobKind::AdHocTask, metadata);
    runner::spawn(state.store.clone(), job_id, spec);

    Ok(Json(JobCreated::new(job_id, "Task execution started")))
}

/// POST /api/roles/run
/// Run one automation role as a background job.
pub async fn run_role(
    State(state): State<AppState>,
    Json(req): Json<RunRole>,
) -> ApiResult<Json<JobCreated>> {
    if req.role_name.trim().is_empty() {
        return Err(ApiError::BadRequest("role_name is required".to_string()));
    }

    let role_path = state.config.project_root.join("roles").join(&req.role_name);
    if !role_path.is_dir() {
        return Err(ApiError::NotFound(format!("Role not found: {}", req.role_name)));
    }

    tracing::info!("Launching role job: {}", req.role_name);

    let mut spec = CommandSpec::new("ansible")
        .args(["localhost", "-c", "local", "-m", "include_role"])
        .arg("-a")
        .arg(format!("name={}", req.role_name))
        .extra_var("skip_ansible_runner", "true")
        .cwd(&state.config.project_root)
        .timeout(TIMEOUT_ROLE);
    for (key, value) in &req.extra_vars {
        spec = spec.extra_var(key, value);
    }
    spec = ensure_kubeconfig(spec);

    let metadata = creation_metadata(&[
        ("role_name", req.role_name.as_str()),
        ("description", req.description.as_deref().unwrap_or("Running role")),
    ]);

    let job_id = state.store.create(JobKind::RoleTask, metadata);
    runner::spawn(state.store.clone(), job_id, spec);

    Ok(Json(JobCreated::new(job_id, "Role execution started")))
}

/// GET /api/jobs
/// List all jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    tracing::debug!("Listing all jobs");
    Json(state.store.list())
}

/// GET /api/jobs/{id}
/// Get the full job record.
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {id} not found")))
}

/// GET /api/jobs/{id}/logs
/// Get the job's captured output lines.
pub async fn get_job_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobLogs>> {
    tracing::debug!("Getting logs for job: {}", id);
    state
        .store
        .get(id)
        .map(|job| Json(JobLogs { logs: job.logs }))
        .ok_or_else(|| ApiError::NotFound(format!("Job {id} not found")))
}

/// DELETE /api/jobs
/// Administrative reset of the job registry.
pub async fn clear_jobs(State(state): State<AppState>) -> Json<serde_json::Value> {
    tracing::info!("Clearing job registry");
    state.store.clear();
    Json(serde_json::json!({ "count": 0 }))
}

/// The spawned process inherits the ambient environment; make sure a
/// kubeconfig is present for automation that talks to the cluster.
pub(crate) fn ensure_kubeconfig(spec: CommandSpec) -> CommandSpec {
    if std::env::var_os("KUBECONFIG").is_some() {
        return spec;
    }
    match std::env::var_os("HOME") {
        Some(home) => {
            let default = std::path::Path::new(&home).join(".kube").join("config");
            spec.env("KUBECONFIG", default.display().to_string())
        }
        None => spec,
    }
}

pub(crate) fn creation_metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
