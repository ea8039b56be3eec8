//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job execution record
///
/// Structure shared between the API layer (serves snapshots) and the
/// background executors (mutate through the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    /// 0-100. Non-decreasing while the job is live; every terminal
    /// transition sets it to 100, success or not. The UI reads 100% as
    /// "no longer running", independent of outcome.
    pub progress: u8,
    /// Latest human-readable status line (overwritten, not appended).
    pub message: String,
    /// Append-only output lines, in the exact order produced.
    pub logs: Vec<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Exit code of the underlying operation, set on terminal transition.
    pub return_code: Option<i32>,
    /// Free-form creation-time context (source file, description, extra
    /// parameters). Never mutated after creation.
    pub metadata: std::collections::HashMap<String, String>,
}

/// What a job wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Playbook,
    RoleTask,
    AdHocTask,
    MultiDocumentApply,
    Deletion,
}

/// Job execution status
///
/// Transitions: Pending -> Running -> exactly one of the terminal states.
/// A terminal job never transitions again; a retry is a new job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

impl Job {
    /// Creates a fresh job in Pending state with empty logs.
    pub fn new(kind: JobKind, metadata: std::collections::HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: JobStatus::Pending,
            progress: 0,
            message: "Job queued for execution".to_string(),
            logs: Vec::new(),
            started_at: chrono::Utc::now(),
            completed_at: None,
            return_code: None,
            metadata,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves a pending job into Running. Ignored once terminal.
    pub fn start(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Running;
        self.advance(10, message);
    }

    /// Updates progress and the status line.
    ///
    /// Progress never regresses: a caller handing in a lower value keeps
    /// the current one. Ignored once terminal.
    pub fn advance(&mut self, progress: u8, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
        self.message = message.into();
    }

    /// Appends one output line. Logs are never truncated or reordered.
    pub fn append_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Terminal transition: success.
    pub fn complete(&mut self, message: impl Into<String>) {
        self.finish(JobStatus::Completed, Some(0), message);
    }

    /// Terminal transition: failure with the exit code, when one exists.
    pub fn fail(&mut self, return_code: Option<i32>, message: impl Into<String>) {
        self.finish(JobStatus::Failed, return_code, message);
    }

    /// Terminal transition: the execution exceeded its time bound and was
    /// killed. 124 matches the conventional shell timeout exit code.
    pub fn time_out(&mut self, message: impl Into<String>) {
        self.finish(JobStatus::Timeout, Some(124), message);
    }

    fn finish(&mut self, status: JobStatus, return_code: Option<i32>, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.progress = 100;
        self.message = message.into();
        self.return_code = return_code;
        self.completed_at = Some(chrono::Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobKind::Playbook, std::collections::HashMap::new())
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.logs.is_empty());
        assert!(job.completed_at.is_none());
        assert!(job.return_code.is_none());
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let mut job = job();
        job.start("starting");
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 10);

        job.advance(30, "executing");
        job.complete("done");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.return_code, Some(0));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut job = job();
        job.start("starting");
        job.advance(50, "halfway");
        job.advance(30, "stale update");
        assert_eq!(job.progress, 50);
        assert_eq!(job.message, "stale update");
    }

    #[test]
    fn test_failure_still_reaches_full_progress() {
        let mut job = job();
        job.start("starting");
        job.fail(Some(2), "boom");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.return_code, Some(2));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_terminal_job_never_transitions_again() {
        let mut job = job();
        job.start("starting");
        job.time_out("timed out after 60s");
        assert_eq!(job.status, JobStatus::Timeout);
        assert_eq!(job.return_code, Some(124));

        job.start("restart attempt");
        job.advance(5, "stale writer");
        job.complete("late success");
        assert_eq!(job.status, JobStatus::Timeout);
        assert_eq!(job.progress, 100);
        assert_eq!(job.message, "timed out after 60s");
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&JobKind::MultiDocumentApply).unwrap(),
            "\"multi-document-apply\""
        );
    }
}
