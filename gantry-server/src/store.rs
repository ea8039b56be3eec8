//! In-memory job registry
//!
//! Single source of truth for job state. Background executors mutate jobs
//! through [`JobStore::mutate`]; HTTP and WebSocket readers take snapshots.
//! Process-lifetime scope only: a restart loses all job history, which is a
//! documented non-goal of this service.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use gantry_core::domain::job::{Job, JobKind};
use uuid::Uuid;

struct Slot {
    /// Creation sequence, used to order listings newest-first.
    seq: u64,
    job: Job,
}

/// Concurrency-safe registry of job records.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Slot>>,
    next_seq: AtomicU64,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Inserts a fresh Pending job and returns its id. Never fails.
    pub fn create(&self, kind: JobKind, metadata: HashMap<String, String>) -> Uuid {
        let job = Job::new(kind, metadata);
        let id = job.id;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.write().unwrap().insert(id, Slot { seq, job });
        id
    }

    /// Snapshot of one job.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().unwrap().get(&id).map(|slot| slot.job.clone())
    }

    /// Applies an in-place update under exclusive access.
    ///
    /// Returns false when the job id is unknown (e.g. the registry was
    /// cleared while an executor was still running).
    pub fn mutate(&self, id: Uuid, f: impl FnOnce(&mut Job)) -> bool {
        let mut jobs = self.jobs.write().unwrap();
        match jobs.get_mut(&id) {
            Some(slot) => {
                f(&mut slot.job);
                true
            }
            None => false,
        }
    }

    /// Snapshot of all jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read().unwrap();
        let mut slots: Vec<_> = jobs.values().map(|slot| (slot.seq, slot.job.clone())).collect();
        slots.sort_by(|a, b| b.0.cmp(&a.0));
        slots.into_iter().map(|(_, job)| job).collect()
    }

    /// Wipes the registry. Administrative reset only.
    pub fn clear(&self) {
        self.jobs.write().unwrap().clear();
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::job::JobStatus;

    #[test]
    fn test_create_then_get() {
        let store = JobStore::new();
        let id = store.create(JobKind::Playbook, HashMap::new());

        let job = store.get(id).expect("job should exist");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.logs.is_empty());
    }

    #[test]
    fn test_get_unknown_id() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_mutate_is_visible_to_readers() {
        let store = JobStore::new();
        let id = store.create(JobKind::AdHocTask, HashMap::new());

        assert!(store.mutate(id, |job| {
            job.start("starting");
            job.append_log("line one");
        }));

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.logs, vec!["line one"]);

        assert!(!store.mutate(Uuid::new_v4(), |_| {}));
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = JobStore::new();
        let first = store.create(JobKind::Playbook, HashMap::new());
        let second = store.create(JobKind::Deletion, HashMap::new());
        let third = store.create(JobKind::RoleTask, HashMap::new());

        let ids: Vec<_> = store.list().into_iter().map(|job| job.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn test_clear() {
        let store = JobStore::new();
        store.create(JobKind::Playbook, HashMap::new());
        store.create(JobKind::Playbook, HashMap::new());
        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = std::sync::Arc::new(JobStore::new());
        let id = store.create(JobKind::MultiDocumentApply, HashMap::new());

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.mutate(id, |job| job.append_log(format!("w{w} line {i}")));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = store.get(id);
                        let _ = store.list();
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(store.get(id).unwrap().logs.len(), 8 * 50);
    }
}
