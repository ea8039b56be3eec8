//! Job DTOs for the HTTP and WebSocket API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus};

/// Request to run an automation playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlaybook {
    pub playbook: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_vars: std::collections::HashMap<String, String>,
}

/// Request to run a single ad-hoc task file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTask {
    pub task_file: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to run one automation role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRole {
    pub role_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_vars: std::collections::HashMap<String, String>,
}

/// Request to provision a cluster through the automation playbooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCluster {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_true")]
    pub network_automation: bool,
    #[serde(default)]
    pub role_automation: bool,
}

fn default_version() -> String {
    "4.20.0".to_string()
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_true() -> bool {
    true
}

/// Request to apply a multi-document manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyManifest {
    /// Raw (possibly multi-document) YAML manifest.
    pub manifest: String,
    /// Default namespace for documents that do not carry their own.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Response for every job-creating endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

impl JobCreated {
    pub fn new(job_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            message: message.into(),
        }
    }
}

/// Response body of the log endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogs {
    pub logs: Vec<String>,
}

/// One progress push over the job WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl JobEvent {
    /// Snapshots the broadcastable fields of a job.
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobKind;

    #[test]
    fn test_job_event_snapshot() {
        let mut job = Job::new(JobKind::AdHocTask, std::collections::HashMap::new());
        job.start("starting");
        let event = JobEvent::from_job(&job);
        assert_eq!(event.job_id, job.id);
        assert_eq!(event.status, JobStatus::Running);
        assert_eq!(event.progress, 10);
        assert_eq!(event.message, "starting");
    }

    #[test]
    fn test_create_cluster_defaults() {
        let req: CreateCluster = serde_json::from_str(r#"{"name": "demo"}"#).unwrap();
        assert_eq!(req.version, "4.20.0");
        assert_eq!(req.region, "us-west-2");
        assert!(req.network_automation);
        assert!(!req.role_automation);
    }
}
