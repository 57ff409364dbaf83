// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! `/proc`: a shallow, read-only synthetic tree generated fresh on every
//! read from host facts.

use std::time::Instant;

use chrono::Utc;
use lifo_domain::error::VfsError;
use lifo_domain::inode::FileType;

use crate::types::Stat;
use crate::providers::virtual_provider::VirtualProvider;

pub struct ProcProvider {
    started_at: Instant,
}

impl Default for ProcProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcProvider {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    fn cpuinfo(&self) -> String {
        let count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        format!("processor\t: 0\ncpu cores\t: {count}\nmodel name\t: Lifo Virtual CPU\n")
    }

    fn meminfo(&self) -> String {
        // Host memory figures aren't available without a platform-sensing
        // dependency outside this crate's stack; report the shape with
        // zeroed values rather than fabricate numbers.
        "MemTotal:       0 kB\nMemFree:        0 kB\nMemAvailable:   0 kB\n".to_string()
    }

    fn uptime(&self) -> String {
        let secs = self.started_at.elapsed().as_secs_f64();
        format!("{secs:.2} 0.00\n")
    }

    fn version(&self) -> String {
        format!(
            "Lifo version {} (in-process virtual kernel)\n",
            env!("CARGO_PKG_VERSION")
        )
    }

    fn net_info(&self) -> String {
        "iface\tstate\nlo\tup\n".to_string()
    }
}

impl VirtualProvider for ProcProvider {
    fn read_file(&self, sub_path: &str) -> Result<Vec<u8>, VfsError> {
        Ok(self.read_file_string(sub_path)?.into_bytes())
    }

    fn read_file_string(&self, sub_path: &str) -> Result<String, VfsError> {
        match sub_path {
            "cpuinfo" => Ok(self.cpuinfo()),
            "meminfo" => Ok(self.meminfo()),
            "uptime" => Ok(self.uptime()),
            "version" => Ok(self.version()),
            "net/info" => Ok(self.net_info()),
            _ => Err(VfsError::not_found(format!("/proc/{sub_path}"))),
        }
    }

    fn exists(&self, sub_path: &str) -> bool {
        matches!(
            sub_path,
            "" | "cpuinfo" | "meminfo" | "uptime" | "version" | "net" | "net/info"
        )
    }

    fn stat(&self, sub_path: &str) -> Result<Stat, VfsError> {
        let now = Utc::now();
        let is_dir = sub_path.is_empty() || sub_path == "net";
        if is_dir {
            return Ok(Stat {
                file_type: FileType::Directory,
                size: 0,
                mtime: now,
                ctime: now,
                mode: 0o555,
                mime: None,
            });
        }
        let content = self.read_file_string(sub_path)?;
        Ok(Stat {
            file_type: FileType::File,
            size: content.len() as u64,
            mtime: now,
            ctime: now,
            mode: 0o444,
            mime: Some("text/plain".to_string()),
        })
    }

    fn readdir(&self, sub_path: &str) -> Result<Vec<String>, VfsError> {
        match sub_path {
            "" => Ok(vec![
                "cpuinfo".to_string(),
                "meminfo".to_string(),
                "uptime".to_string(),
                "version".to_string(),
                "net".to_string(),
            ]),
            "net" => Ok(vec!["info".to_string()]),
            _ => Err(VfsError::not_dir(format!("/proc/{sub_path}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readdir_root_is_fixed() {
        let proc = ProcProvider::new();
        let names = proc.readdir("").unwrap();
        assert_eq!(names, vec!["cpuinfo", "meminfo", "uptime", "version", "net"]);
        assert_eq!(proc.readdir("net").unwrap(), vec!["info"]);
    }

    #[test]
    fn leaf_stat_is_readonly_file() {
        let proc = ProcProvider::new();
        let stat = proc.stat("uptime").unwrap();
        assert_eq!(stat.mode, 0o444);
        assert_eq!(stat.file_type, FileType::File);
    }

    #[test]
    fn write_is_rejected_by_default() {
        let proc = ProcProvider::new();
        assert!(proc.write_file("uptime", b"x").is_err());
    }
}
