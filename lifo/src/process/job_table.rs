// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! `JobTable`: shell-visible job ids for background pipelines.
//!
//! A job is a thin pointer from a per-shell monotonic id to the pid of the
//! pipeline's last stage and the command line that started it; the live
//! status is always read back from the [`super::registry::ProcessRegistry`]
//! rather than duplicated here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct JobEntry {
    pub job_id: u32,
    pub pid: u32,
    pub command_line: String,
}

#[derive(Default)]
pub struct JobTable {
    next_job_id: AtomicU32,
    jobs: Mutex<HashMap<u32, JobEntry>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            next_job_id: AtomicU32::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a background pipeline, returning its new job id.
    pub fn add(&self, pid: u32, command_line: impl Into<String>) -> u32 {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().insert(
            job_id,
            JobEntry {
                job_id,
                pid,
                command_line: command_line.into(),
            },
        );
        job_id
    }

    pub fn get_by_job_id(&self, job_id: u32) -> Option<JobEntry> {
        self.jobs.lock().get(&job_id).cloned()
    }

    /// All currently tracked background jobs, ordered by job id.
    pub fn get_background_jobs(&self) -> Vec<JobEntry> {
        let mut all: Vec<JobEntry> = self.jobs.lock().values().cloned().collect();
        all.sort_by_key(|j| j.job_id);
        all
    }

    /// Drop a job's bookkeeping entry, normally once its process has been
    /// reaped.
    pub fn remove(&self, job_id: u32) -> Option<JobEntry> {
        self.jobs.lock().remove(&job_id)
    }

    /// Parse a `%N` job spec into a pid, so `kill` can target a job by
    /// number as well as by raw pid.
    pub fn resolve_job_spec(&self, spec: &str) -> Option<u32> {
        let job_id: u32 = spec.strip_prefix('%')?.parse().ok()?;
        self.get_by_job_id(job_id).map(|j| j.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_monotonic_and_not_recycled() {
        let table = JobTable::new();
        let a = table.add(2, "sleep 10");
        let b = table.add(3, "sleep 20");
        assert!(b > a);
        table.remove(a);
        let c = table.add(4, "sleep 30");
        assert!(c > b);
    }

    #[test]
    fn job_spec_resolves_to_pid() {
        let table = JobTable::new();
        let job_id = table.add(7, "sleep 10");
        assert_eq!(table.resolve_job_spec(&format!("%{job_id}")), Some(7));
        assert_eq!(table.resolve_job_spec("%999"), None);
        assert_eq!(table.resolve_job_spec("nope"), None);
    }

    #[test]
    fn background_jobs_listed_in_id_order() {
        let table = JobTable::new();
        table.add(2, "a");
        table.add(3, "b");
        let jobs = table.get_background_jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].job_id < jobs[1].job_id);
    }
}
