// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The process record (spec §3 "Process record", §4.K).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    Stopped,
    /// Exited; retains its exit code until reaped.
    Zombie { exit_code: i32 },
}

impl ProcessStatus {
    /// Valid transitions per spec §4.K: `running ↔ sleeping`,
    /// `running -> stopped`, `stopped -> running`, and any state -> zombie.
    pub fn can_transition_to(self, next: ProcessStatus) -> bool {
        use ProcessStatus::*;
        match (self, next) {
            (_, Zombie { .. }) => true,
            (Running, Sleeping) | (Sleeping, Running) => true,
            (Running, Stopped) | (Stopped, Running) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: u32,
    pub job_id: Option<u32>,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub status: ProcessStatus,
    pub is_foreground: bool,
    pub started_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub cancel: CancelToken,
}

impl ProcessRecord {
    pub fn is_zombie(&self) -> bool {
        matches!(self.status, ProcessStatus::Zombie { .. })
    }
}
