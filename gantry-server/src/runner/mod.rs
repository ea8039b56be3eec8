//! Background job execution
//!
//! Runs one external process per job, decoupled from the HTTP request that
//! created it. Output is streamed into the job's log as lines arrive; the
//! wait is bounded by the command spec's timeout. Every outcome - success,
//! failure, timeout, spawn error - lands in the job record; nothing is
//! raised past this module's boundary.

pub mod markers;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::JobStore;

/// Default time bounds by operation shape. The timeout is a property of
/// the command spec, never a global constant.
pub const TIMEOUT_INTERACTIVE: Duration = Duration::from_secs(60);
pub const TIMEOUT_TASK: Duration = Duration::from_secs(300);
pub const TIMEOUT_ROLE: Duration = Duration::from_secs(600);
pub const TIMEOUT_PLAYBOOK: Duration = Duration::from_secs(1800);

/// One external command plus its execution constraints.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Job-specific overrides layered on top of the ambient environment.
    pub env: HashMap<String, String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            timeout: TIMEOUT_TASK,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds a `-e key=value` extra-var pair.
    pub fn extra_var(self, key: &str, value: &str) -> Self {
        self.arg("-e").arg(format!("{key}={value}"))
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Starts background execution of `spec` against the job record.
///
/// Returns immediately; the calling handler responds with the job id
/// while the process runs on its own task.
pub fn spawn(store: Arc<JobStore>, job_id: Uuid, spec: CommandSpec) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        execute(store, job_id, spec).await;
    })
}

async fn execute(store: Arc<JobStore>, job_id: Uuid, spec: CommandSpec) {
    info!("Job {} executing: {}", job_id, spec.display());
    store.mutate(job_id, |job| job.start(format!("Starting {}", spec.program)));

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Job {} failed to launch {}: {}", job_id, spec.program, e);
            store.mutate(job_id, |job| {
                job.fail(None, format!("Failed to launch {}: {}", spec.program, e));
            });
            return;
        }
    };

    store.mutate(job_id, |job| job.advance(30, format!("Executing {}", spec.program)));

    // Pipes were requested above; take() cannot miss.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = tokio::spawn(pump_lines(stdout, store.clone(), job_id));
    let stderr_task = tokio::spawn(pump_lines(stderr, store.clone(), job_id));

    let status = match tokio::time::timeout(spec.timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            store.mutate(job_id, |job| {
                job.fail(None, format!("Failed waiting on {}: {}", spec.program, e));
            });
            return;
        }
        Err(_) => {
            let seconds = spec.timeout.as_secs();
            warn!("Job {} timed out after {}s, killing process", job_id, seconds);
            let _ = child.start_kill();
            let _ = child.wait().await;
            // Drain whatever was produced before the kill, but with a
            // bound: surviving grandchildren can hold the pipes open.
            let drain = Duration::from_secs(2);
            if tokio::time::timeout(drain, stdout_task).await.is_err() {
                debug!("Job {} stdout pump still blocked after kill", job_id);
            }
            let _ = tokio::time::timeout(drain, stderr_task).await;
            store.mutate(job_id, |job| {
                job.time_out(format!(
                    "{} timed out after {} seconds",
                    spec.program, seconds
                ));
            });
            return;
        }
    };

    let stdout_lines = stdout_task.await.unwrap_or_default();
    let stderr_lines = stderr_task.await.unwrap_or_default();

    if status.success() {
        info!("Job {} completed successfully", job_id);
        store.mutate(job_id, |job| {
            job.complete(format!("{} completed successfully", spec.program));
        });
    } else {
        let code = status.code().unwrap_or(-1);
        let message = markers::extract_failure_message(&stdout_lines, &stderr_lines);
        info!("Job {} failed with exit code {}: {}", job_id, code, message);
        store.mutate(job_id, |job| job.fail(Some(code), message));
    }
}

/// Streams one pipe into the job log line by line, returning the lines
/// for post-mortem scanning.
async fn pump_lines<R>(reader: Option<R>, store: Arc<JobStore>, job_id: Uuid) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Vec::new();
    };

    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("Job {} output: {}", job_id, line);
        store.mutate(job_id, |job| job.append_log(line.clone()));
        collected.push(line);
    }
    collected
}
