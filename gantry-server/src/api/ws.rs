//! WebSocket job updates
//!
//! Per-connection loop pushing progress diffs for one job. Polling the
//! store on a short fixed interval is deliberate: job volume is low and
//! the store snapshot is cheap, so an event channel per job is not worth
//! its bookkeeping (yet).

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::Response,
};
use futures_util::sink::SinkExt;
use gantry_core::domain::job::Job;
use gantry_core::dto::job::JobEvent;
use uuid::Uuid;

use crate::state::AppState;

/// GET /ws/jobs/{id}
/// Stream progress updates until the job reaches a terminal state.
pub async fn job_updates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| stream_job(socket, state, id))
}

async fn stream_job(mut socket: WebSocket, state: AppState, id: Uuid) {
    if state.store.get(id).is_none() {
        tracing::debug!("WebSocket for unknown job {}", id);
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "Job not found".into(),
            })))
            .await;
        return;
    }

    let mut last_progress = None;
    loop {
        // The registry can be cleared out from under a live connection.
        let Some(job) = state.store.get(id) else {
            break;
        };

        if let Some(event) = next_event(&job, last_progress) {
            last_progress = Some(event.progress);
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Failed to serialize job event: {}", e);
                    break;
                }
            };
            if socket.send(Message::Text(payload.into())).await.is_err() {
                // Client went away.
                return;
            }
        }

        // The terminal push above is the last event; nothing follows it.
        if job.is_terminal() {
            break;
        }

        tokio::time::sleep(state.config.ws_poll_interval).await;
    }

    let _ = socket.close().await;
}

/// An event is due exactly when progress moved since the last push.
fn next_event(job: &Job, last_progress: Option<u8>) -> Option<JobEvent> {
    (last_progress != Some(job.progress)).then(|| JobEvent::from_job(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::job::{JobKind, JobStatus};
    use std::collections::HashMap;

    #[test]
    fn test_first_snapshot_always_emits() {
        let job = Job::new(JobKind::Playbook, HashMap::new());
        let event = next_event(&job, None).expect("initial event");
        assert_eq!(event.status, JobStatus::Pending);
        assert_eq!(event.progress, 0);
    }

    #[test]
    fn test_unchanged_progress_is_silent() {
        let mut job = Job::new(JobKind::Playbook, HashMap::new());
        job.start("starting");
        assert!(next_event(&job, Some(10)).is_none());
        // Message changes without progress movement stay quiet too.
        job.advance(10, "still at ten");
        assert!(next_event(&job, Some(10)).is_none());
    }

    #[test]
    fn test_progress_change_emits() {
        let mut job = Job::new(JobKind::Playbook, HashMap::new());
        job.start("starting");
        job.advance(45, "halfway-ish");
        let event = next_event(&job, Some(10)).expect("progress moved");
        assert_eq!(event.progress, 45);
        assert_eq!(event.message, "halfway-ish");
    }

    #[test]
    fn test_terminal_write_emits_final_event() {
        let mut job = Job::new(JobKind::Playbook, HashMap::new());
        job.start("starting");
        job.fail(Some(2), "boom");
        let event = next_event(&job, Some(10)).expect("terminal event");
        assert_eq!(event.progress, 100);
        assert_eq!(event.status, JobStatus::Failed);
        // And once pushed, the terminal snapshot is quiet.
        assert!(next_event(&job, Some(100)).is_none());
    }
}
