//! Multi-document manifest apply
//!
//! Applies an ordered document sequence one at a time, with job-store
//! progress bookkeeping. The first failure aborts the remainder of the
//! sequence; documents already applied stay applied (no rollback). When a
//! document provisions a namespace boundary, the hub pull-secret is copied
//! into it as a best-effort secondary step.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gantry_core::domain::document::Document;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use crate::runner::TIMEOUT_INTERACTIVE;
use crate::store::JobStore;

/// Progress reserved for parsing/setup before the first document lands.
const PROGRESS_BASELINE: u8 = 20;
/// Progress span distributed across the documents; the terminal
/// transition finalizes to 100 on its own.
const PROGRESS_SPAN: u8 = 70;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{0}")]
    Failed(String),
    #[error("apply timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Seam between the apply loop and the cluster. Production talks to
/// kubectl; tests inject a scripted fake.
#[async_trait]
pub trait ApplyBackend: Send + Sync {
    /// Applies a single serialized document.
    async fn apply(&self, document: &Document) -> Result<(), ApplyError>;

    /// Copies the hub pull-secret into a freshly provisioned namespace.
    async fn copy_pull_secret(&self, namespace: &str) -> Result<(), ApplyError>;
}

/// Starts the apply sequence on its own task; the caller returns with the
/// job id immediately.
pub fn spawn(
    store: Arc<JobStore>,
    job_id: Uuid,
    documents: Vec<Document>,
    backend: Arc<dyn ApplyBackend>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(store, job_id, documents, backend).await;
    })
}

async fn run(store: Arc<JobStore>, job_id: Uuid, documents: Vec<Document>, backend: Arc<dyn ApplyBackend>) {
    let total = documents.len();
    info!("Job {} applying {} document(s)", job_id, total);
    store.mutate(job_id, |job| {
        job.start("Starting manifest apply");
        job.advance(PROGRESS_BASELINE, format!("Applying {total} document(s)"));
        job.append_log(format!("Parsed {total} document(s)"));
    });

    for (index, document) in documents.iter().enumerate() {
        let label = document.display_name();
        if let Err(e) = backend.apply(document).await {
            warn!("Job {} apply failed on {}: {}", job_id, label, e);
            store.mutate(job_id, |job| {
                job.append_log(format!("Failed to apply {label}: {e}"));
                job.fail(None, format!("Apply failed for {label}"));
            });
            // Documents already applied stay applied; the rest are skipped.
            return;
        }

        store.mutate(job_id, |job| job.append_log(format!("Applied {label}")));

        if document.provisions_namespace() {
            let namespace = document.namespace.as_deref().unwrap_or(&document.name);
            if let Err(e) = backend.copy_pull_secret(namespace).await {
                // Best effort only: a missing pull-secret is fixable later
                // and must not fail the apply job.
                warn!("Job {} pull-secret copy into {} failed: {}", job_id, namespace, e);
                store.mutate(job_id, |job| {
                    job.append_log(format!(
                        "Warning: could not copy pull-secret into {namespace}: {e}"
                    ));
                });
            } else {
                store.mutate(job_id, |job| {
                    job.append_log(format!("Copied pull-secret into {namespace}"));
                });
            }
        }

        let applied = (index + 1) as u32;
        let progress = PROGRESS_BASELINE + (PROGRESS_SPAN as u32 * applied / total as u32) as u8;
        store.mutate(job_id, |job| {
            job.advance(progress, format!("Applied {applied}/{total} document(s)"));
        });
    }

    info!("Job {} applied all {} document(s)", job_id, total);
    store.mutate(job_id, |job| {
        job.complete(format!("Applied {total} document(s) successfully"));
    });
}

/// kubectl-backed implementation; documents are piped through stdin.
pub struct KubectlBackend {
    timeout: Duration,
}

impl KubectlBackend {
    pub fn new() -> Self {
        Self {
            timeout: TIMEOUT_INTERACTIVE,
        }
    }

    async fn run_with_stdin(&self, args: &[&str], stdin_payload: Option<&str>) -> Result<String, ApplyError> {
        let mut command = Command::new("kubectl");
        command
            .args(args)
            .stdin(if stdin_payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ApplyError::Failed(format!("failed to launch kubectl: {e}")))?;

        if let (Some(payload), Some(mut stdin)) = (stdin_payload, child.stdin.take()) {
            stdin
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| ApplyError::Failed(format!("failed to write manifest: {e}")))?;
            drop(stdin);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ApplyError::Timeout(self.timeout))?
            .map_err(|e| ApplyError::Failed(format!("kubectl did not finish: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ApplyError::Failed(stderr.trim().to_string()))
        }
    }
}

impl Default for KubectlBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApplyBackend for KubectlBackend {
    async fn apply(&self, document: &Document) -> Result<(), ApplyError> {
        let mut args = vec!["apply", "-f", "-"];
        if let Some(namespace) = &document.namespace {
            args.extend(["-n", namespace.as_str()]);
        }
        self.run_with_stdin(&args, Some(&document.payload)).await?;
        Ok(())
    }

    async fn copy_pull_secret(&self, namespace: &str) -> Result<(), ApplyError> {
        let raw = self
            .run_with_stdin(
                &["get", "secret", "pull-secret", "-n", "openshift-config", "-o", "json"],
                None,
            )
            .await?;

        let mut secret: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ApplyError::Failed(format!("unparseable pull-secret: {e}")))?;

        // Rehome the secret: scrub the server-assigned identity fields so
        // the apply creates a fresh object in the target namespace.
        if let Some(metadata) = secret.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            metadata.insert("namespace".to_string(), serde_json::json!(namespace));
            for field in ["resourceVersion", "uid", "creationTimestamp", "managedFields", "ownerReferences"] {
                metadata.remove(field);
            }
        }

        self.run_with_stdin(&["apply", "-n", namespace, "-f", "-"], Some(&secret.to_string()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::job::{JobKind, JobStatus};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn document(kind: &str, name: &str, namespace: Option<&str>) -> Document {
        Document {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.map(|s| s.to_string()),
            payload: format!("kind: {kind}\nmetadata:\n  name: {name}\n"),
        }
    }

    /// Scripted backend: fails on the named documents, records call order.
    struct FakeBackend {
        fail_on: Vec<String>,
        fail_secret_copy: bool,
        applied: Mutex<Vec<String>>,
        secret_copies: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                fail_on: Vec::new(),
                fail_secret_copy: false,
                applied: Mutex::new(Vec::new()),
                secret_copies: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(name: &str) -> Self {
            Self {
                fail_on: vec![name.to_string()],
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ApplyBackend for FakeBackend {
        async fn apply(&self, document: &Document) -> Result<(), ApplyError> {
            if self.fail_on.contains(&document.name) {
                return Err(ApplyError::Failed("server rejected the manifest".to_string()));
            }
            self.applied.lock().unwrap().push(document.display_name());
            Ok(())
        }

        async fn copy_pull_secret(&self, namespace: &str) -> Result<(), ApplyError> {
            if self.fail_secret_copy {
                return Err(ApplyError::Failed("pull-secret not found".to_string()));
            }
            self.secret_copies.lock().unwrap().push(namespace.to_string());
            Ok(())
        }
    }

    async fn run_apply(documents: Vec<Document>, backend: FakeBackend) -> (gantry_core::domain::job::Job, FakeBackend) {
        let store = Arc::new(JobStore::new());
        let id = store.create(JobKind::MultiDocumentApply, HashMap::new());
        let backend = Arc::new(backend);
        spawn(store.clone(), id, documents, backend.clone()).await.unwrap();
        let job = store.get(id).unwrap();
        (job, Arc::try_unwrap(backend).unwrap_or_else(|_| panic!("backend still shared")))
    }

    #[tokio::test]
    async fn test_all_documents_applied_in_order() {
        let documents = vec![
            document("ConfigMap", "alpha", Some("demo")),
            document("Secret", "beta", Some("demo")),
        ];
        let (job, backend) = run_apply(documents, FakeBackend::new()).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(
            *backend.applied.lock().unwrap(),
            vec!["ConfigMap/alpha", "Secret/beta"]
        );
        assert!(job.logs.iter().any(|l| l == "Applied ConfigMap/alpha"));
        assert!(job.logs.iter().any(|l| l == "Applied Secret/beta"));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_documents() {
        let documents = vec![
            document("ConfigMap", "first", Some("demo")),
            document("ConfigMap", "second", Some("demo")),
            document("ConfigMap", "third", Some("demo")),
        ];
        let (job, backend) = run_apply(documents, FakeBackend::failing_on("second")).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.message, "Apply failed for ConfigMap/second");
        assert_eq!(*backend.applied.lock().unwrap(), vec!["ConfigMap/first"]);

        assert!(job.logs.iter().any(|l| l == "Applied ConfigMap/first"));
        assert!(job.logs.iter().any(|l| l.starts_with("Failed to apply ConfigMap/second")));
        assert!(!job.logs.iter().any(|l| l.contains("third")));
    }

    #[tokio::test]
    async fn test_namespace_document_triggers_pull_secret_copy() {
        let documents = vec![
            document("Namespace", "ns-new", None),
            document("ManagedCluster", "spoke-1", Some("spoke-1")),
            document("ConfigMap", "plain", Some("demo")),
        ];
        let (job, backend) = run_apply(documents, FakeBackend::new()).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(*backend.secret_copies.lock().unwrap(), vec!["ns-new", "spoke-1"]);
        assert!(job.logs.iter().any(|l| l == "Copied pull-secret into ns-new"));
    }

    #[tokio::test]
    async fn test_pull_secret_copy_failure_is_only_a_warning() {
        let documents = vec![document("Namespace", "ns-new", None)];
        let backend = FakeBackend {
            fail_secret_copy: true,
            ..FakeBackend::new()
        };
        let (job, _) = run_apply(documents, backend).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job
            .logs
            .iter()
            .any(|l| l.starts_with("Warning: could not copy pull-secret into ns-new")));
    }

    #[tokio::test]
    async fn test_progress_advances_per_document() {
        let store = Arc::new(JobStore::new());
        let id = store.create(JobKind::MultiDocumentApply, HashMap::new());
        let documents = vec![
            document("ConfigMap", "a", None),
            document("ConfigMap", "b", None),
            document("ConfigMap", "c", None),
        ];
        // Fail on the last document so the finalize-to-100 write does not
        // mask the incremental values.
        let backend = Arc::new(FakeBackend::failing_on("c"));
        spawn(store.clone(), id, documents, backend).await.unwrap();

        let job = store.get(id).unwrap();
        // Two of three applied: 20 + 70*2/3 = 66 was reached, then the
        // failure finalized to 100.
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert!(job.logs.iter().any(|l| l == "Applied ConfigMap/b"));
    }
}
