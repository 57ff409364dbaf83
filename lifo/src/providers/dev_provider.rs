// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! `/dev`: `null`, `zero`, `random`, `urandom`, `clipboard`.

use chrono::Utc;
use lifo_domain::error::VfsError;
use lifo_domain::inode::FileType;
use parking_lot::Mutex;

use crate::providers::virtual_provider::VirtualProvider;
use crate::types::Stat;

/// Conventional fixed read size for `/dev/zero` and the random devices.
const DEVICE_BUFFER_SIZE: usize = 4096;

pub struct DevProvider {
    clipboard: Mutex<Vec<u8>>,
}

impl Default for DevProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DevProvider {
    pub fn new() -> Self {
        Self {
            clipboard: Mutex::new(Vec::new()),
        }
    }

    fn pseudo_random_bytes(&self) -> Vec<u8> {
        // Not cryptographically secure: this is a virtual device inside a
        // cooperative, single-threaded simulation, not a security boundary.
        let mut state = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x2545F4914F6CDD1D);
        let mut out = Vec::with_capacity(DEVICE_BUFFER_SIZE);
        for _ in 0..DEVICE_BUFFER_SIZE {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            out.push((state & 0xff) as u8);
        }
        out
    }
}

impl VirtualProvider for DevProvider {
    fn read_file(&self, sub_path: &str) -> Result<Vec<u8>, VfsError> {
        match sub_path {
            "null" => Ok(Vec::new()),
            "zero" => Ok(vec![0u8; DEVICE_BUFFER_SIZE]),
            "random" | "urandom" => Ok(self.pseudo_random_bytes()),
            "clipboard" => Ok(self.clipboard.lock().clone()),
            _ => Err(VfsError::not_found(format!("/dev/{sub_path}"))),
        }
    }

    fn write_file(&self, sub_path: &str, data: &[u8]) -> Result<(), VfsError> {
        match sub_path {
            "null" => Ok(()), // discard
            "clipboard" => {
                *self.clipboard.lock() = data.to_vec();
                Ok(())
            }
            "zero" | "random" | "urandom" => {
                Err(VfsError::invalid(format!("/dev/{sub_path} is not writable")))
            }
            _ => Err(VfsError::not_found(format!("/dev/{sub_path}"))),
        }
    }

    fn exists(&self, sub_path: &str) -> bool {
        matches!(
            sub_path,
            "" | "null" | "zero" | "random" | "urandom" | "clipboard"
        )
    }

    fn stat(&self, sub_path: &str) -> Result<Stat, VfsError> {
        let now = Utc::now();
        if sub_path.is_empty() {
            return Ok(Stat {
                file_type: FileType::Directory,
                size: 0,
                mtime: now,
                ctime: now,
                mode: 0o555,
                mime: None,
            });
        }
        if !self.exists(sub_path) {
            return Err(VfsError::not_found(format!("/dev/{sub_path}")));
        }
        let size = match sub_path {
            "null" => 0,
            "clipboard" => self.clipboard.lock().len() as u64,
            _ => DEVICE_BUFFER_SIZE as u64,
        };
        let mode = if sub_path == "null" || sub_path == "clipboard" {
            0o666
        } else {
            0o444
        };
        Ok(Stat {
            file_type: FileType::File,
            size,
            mtime: now,
            ctime: now,
            mode,
            mime: Some("application/octet-stream".to_string()),
        })
    }

    fn readdir(&self, sub_path: &str) -> Result<Vec<String>, VfsError> {
        if sub_path.is_empty() {
            Ok(vec![
                "null".to_string(),
                "zero".to_string(),
                "random".to_string(),
                "urandom".to_string(),
                "clipboard".to_string(),
            ])
        } else {
            Err(VfsError::not_dir(format!("/dev/{sub_path}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_discards_writes_and_reads_empty() {
        let dev = DevProvider::new();
        assert_eq!(dev.read_file("null").unwrap(), Vec::<u8>::new());
        dev.write_file("null", b"ignored").unwrap();
        assert_eq!(dev.read_file("null").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn zero_and_random_have_conventional_size() {
        let dev = DevProvider::new();
        assert_eq!(dev.read_file("zero").unwrap().len(), DEVICE_BUFFER_SIZE);
        assert_eq!(dev.read_file("random").unwrap().len(), DEVICE_BUFFER_SIZE);
    }

    #[test]
    fn writes_to_non_writable_devices_fail_einval() {
        let dev = DevProvider::new();
        assert!(dev.write_file("zero", b"x").is_err());
        assert!(dev.write_file("random", b"x").is_err());
    }

    #[test]
    fn clipboard_round_trips() {
        let dev = DevProvider::new();
        dev.write_file("clipboard", b"copied text").unwrap();
        assert_eq!(dev.read_file("clipboard").unwrap(), b"copied text");
    }
}
