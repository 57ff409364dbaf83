// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! `ProcessRegistry`: PID allocation, status lifecycle, and kill/reap.
//!
//! Mutated only by the executor; everything else takes a snapshot via
//! [`ProcessRegistry::get_all`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;

use lifo_domain::cancel::CancelToken;
use lifo_domain::process::{ProcessRecord, ProcessStatus};
use lifo_domain::{FIRST_SPAWNED_PID, SHELL_PID};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("no such process: {0}")]
    NotFound(u32),
    #[error("pid {0} is the shell and may not be killed or reaped")]
    ProtectedPid(u32),
    #[error("invalid status transition for pid {0}")]
    InvalidTransition(u32),
}

/// Arguments for registering a freshly spawned process; everything the
/// shell already knows at dispatch time.
pub struct Spawn {
    pub ppid: u32,
    pub job_id: Option<u32>,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub is_foreground: bool,
}

pub struct ProcessRegistry {
    next_pid: AtomicU32,
    processes: Mutex<HashMap<u32, ProcessRecord>>,
}

impl ProcessRegistry {
    /// Seeds PID 1 for the shell itself.
    pub fn new() -> Self {
        let mut processes = HashMap::new();
        processes.insert(
            SHELL_PID,
            ProcessRecord {
                pid: SHELL_PID,
                ppid: 0,
                job_id: None,
                command: "sh".to_string(),
                args: Vec::new(),
                cwd: "/".to_string(),
                env: HashMap::new(),
                status: ProcessStatus::Running,
                is_foreground: true,
                started_at: Utc::now(),
                exit_code: None,
                cancel: CancelToken::new(),
            },
        );
        Self {
            next_pid: AtomicU32::new(FIRST_SPAWNED_PID),
            processes: Mutex::new(processes),
        }
    }

    /// Allocate the next PID. Strictly greater than every PID previously
    /// assigned in this registry's lifetime.
    pub fn allocate_pid(&self) -> u32 {
        self.next_pid.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a newly spawned process, returning its record (with a
    /// freshly allocated PID and cancel token).
    pub fn spawn(&self, spawn: Spawn) -> ProcessRecord {
        let pid = self.allocate_pid();
        let record = ProcessRecord {
            pid,
            ppid: spawn.ppid,
            job_id: spawn.job_id,
            command: spawn.command,
            args: spawn.args,
            cwd: spawn.cwd,
            env: spawn.env,
            status: ProcessStatus::Running,
            is_foreground: spawn.is_foreground,
            started_at: Utc::now(),
            exit_code: None,
            cancel: CancelToken::new(),
        };
        self.processes.lock().insert(pid, record.clone());
        record
    }

    pub fn get(&self, pid: u32) -> Option<ProcessRecord> {
        self.processes.lock().get(&pid).cloned()
    }

    /// A full snapshot of every tracked process, live or zombie.
    pub fn get_all(&self) -> Vec<ProcessRecord> {
        let mut all: Vec<ProcessRecord> = self.processes.lock().values().cloned().collect();
        all.sort_by_key(|p| p.pid);
        all
    }

    /// Apply a status transition. Validated against
    /// [`ProcessStatus::can_transition_to`].
    pub fn update_status(&self, pid: u32, next: ProcessStatus) -> Result<(), ProcessError> {
        let mut processes = self.processes.lock();
        let record = processes.get_mut(&pid).ok_or(ProcessError::NotFound(pid))?;
        if !record.status.can_transition_to(next) {
            return Err(ProcessError::InvalidTransition(pid));
        }
        record.status = next;
        if let ProcessStatus::Zombie { exit_code } = next {
            record.exit_code = Some(exit_code);
        }
        Ok(())
    }

    /// Remove a zombie process. A no-op on a non-zombie pid; PID 1 is
    /// exempt from kill/reap entirely.
    pub fn reap(&self, pid: u32) -> Result<Option<ProcessRecord>, ProcessError> {
        if pid == SHELL_PID {
            return Err(ProcessError::ProtectedPid(pid));
        }
        let mut processes = self.processes.lock();
        match processes.get(&pid) {
            Some(record) if record.is_zombie() => Ok(processes.remove(&pid)),
            Some(_) => Ok(None),
            None => Err(ProcessError::NotFound(pid)),
        }
    }

    /// Fire the process's cooperative cancellation token. `"KILL"` is
    /// treated as immediate: the record is marked a zombie right away
    /// rather than waiting for the command to observe the token at its
    /// next I/O boundary.
    pub fn kill(&self, pid: u32, signal_name: Option<&str>) -> Result<(), ProcessError> {
        if pid == SHELL_PID {
            return Err(ProcessError::ProtectedPid(pid));
        }
        let mut processes = self.processes.lock();
        let record = processes.get_mut(&pid).ok_or(ProcessError::NotFound(pid))?;
        record.cancel.cancel();
        if signal_name.map(|s| s.eq_ignore_ascii_case("KILL")).unwrap_or(false) {
            record.status = ProcessStatus::Zombie { exit_code: 137 };
            record.exit_code = Some(137);
        }
        Ok(())
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_args(registry: &ProcessRegistry, command: &str) -> ProcessRecord {
        registry.spawn(Spawn {
            ppid: SHELL_PID,
            job_id: None,
            command: command.to_string(),
            args: Vec::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            is_foreground: true,
        })
    }

    #[test]
    fn pids_are_strictly_increasing_and_never_reused() {
        let registry = ProcessRegistry::new();
        let a = spawn_args(&registry, "a");
        let b = spawn_args(&registry, "b");
        assert!(b.pid > a.pid);
        assert!(a.pid > SHELL_PID);
    }

    #[test]
    fn pid_one_cannot_be_killed_or_reaped() {
        let registry = ProcessRegistry::new();
        assert_eq!(registry.kill(SHELL_PID, None), Err(ProcessError::ProtectedPid(SHELL_PID)));
        assert_eq!(registry.reap(SHELL_PID).unwrap_err(), ProcessError::ProtectedPid(SHELL_PID));
    }

    #[test]
    fn reap_is_a_no_op_on_a_non_zombie() {
        let registry = ProcessRegistry::new();
        let p = spawn_args(&registry, "sleep");
        assert!(registry.reap(p.pid).unwrap().is_none());
        assert!(registry.get(p.pid).is_some());
    }

    #[test]
    fn reap_removes_a_zombie() {
        let registry = ProcessRegistry::new();
        let p = spawn_args(&registry, "sleep");
        registry.update_status(p.pid, ProcessStatus::Zombie { exit_code: 0 }).unwrap();
        let reaped = registry.reap(p.pid).unwrap().unwrap();
        assert_eq!(reaped.pid, p.pid);
        assert!(registry.get(p.pid).is_none());
    }

    #[test]
    fn kill_fires_the_cancel_token() {
        let registry = ProcessRegistry::new();
        let p = spawn_args(&registry, "sleep");
        registry.kill(p.pid, None).unwrap();
        assert!(registry.get(p.pid).unwrap().cancel.is_cancelled());
    }

    #[test]
    fn kill_signal_marks_zombie_immediately() {
        let registry = ProcessRegistry::new();
        let p = spawn_args(&registry, "sleep");
        registry.kill(p.pid, Some("KILL")).unwrap();
        assert!(registry.get(p.pid).unwrap().is_zombie());
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let registry = ProcessRegistry::new();
        let p = spawn_args(&registry, "sleep");
        registry.update_status(p.pid, ProcessStatus::Zombie { exit_code: 0 }).unwrap();
        assert_eq!(
            registry.update_status(p.pid, ProcessStatus::Running),
            Err(ProcessError::InvalidTransition(p.pid))
        );
    }
}
