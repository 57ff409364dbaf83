// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! `NativeFsProvider`: a `MountProvider` that proxies to a sandboxed
//! directory on the host filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lifo_domain::error::VfsError;
use lifo_domain::inode::FileType;
use lifo_domain::path::normalize_bounded;

use crate::providers::mount_provider::MountProvider;
use crate::types::Stat;

pub struct NativeFsProvider {
    base: PathBuf,
    read_only: bool,
}

impl NativeFsProvider {
    pub fn new(base: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            base: base.into(),
            read_only,
        }
    }

    fn resolve(&self, sub_path: &str) -> Result<PathBuf, VfsError> {
        let bounded = normalize_bounded(sub_path)?;
        Ok(self.base.join(bounded))
    }

    fn check_writable(&self) -> Result<(), VfsError> {
        if self.read_only {
            Err(VfsError::invalid("mount is read-only"))
        } else {
            Ok(())
        }
    }

    fn file_metadata_to_stat(meta: &std::fs::Metadata) -> Stat {
        let to_chrono = |t: std::io::Result<std::time::SystemTime>| -> DateTime<Utc> {
            t.ok()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now)
        };
        Stat {
            file_type: if meta.is_dir() {
                FileType::Directory
            } else {
                FileType::File
            },
            size: meta.len(),
            mtime: to_chrono(meta.modified()),
            ctime: to_chrono(meta.created().or_else(|_| meta.modified())),
            mode: if meta.is_dir() { 0o755 } else { 0o644 },
            mime: if meta.is_dir() {
                None
            } else {
                Some(lifo_domain::mime::DEFAULT_MIME.to_string())
            },
        }
    }

    fn map_io_err(err: std::io::Error, path: &Path) -> VfsError {
        match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::not_found(path.display()),
            std::io::ErrorKind::AlreadyExists => VfsError::exists(path.display()),
            _ => VfsError::invalid(format!("{}: {err}", path.display())),
        }
    }
}

impl MountProvider for NativeFsProvider {
    fn read_file(&self, sub_path: &str) -> Result<Vec<u8>, VfsError> {
        let path = self.resolve(sub_path)?;
        if path.is_dir() {
            return Err(VfsError::is_dir(path.display()));
        }
        std::fs::read(&path).map_err(|e| Self::map_io_err(e, &path))
    }

    fn write_file(&self, sub_path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.check_writable()?;
        let path = self.resolve(sub_path)?;
        if path.is_dir() {
            return Err(VfsError::is_dir(path.display()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::map_io_err(e, parent))?;
        }
        std::fs::write(&path, data).map_err(|e| Self::map_io_err(e, &path))
    }

    fn exists(&self, sub_path: &str) -> bool {
        self.resolve(sub_path)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn stat(&self, sub_path: &str) -> Result<Stat, VfsError> {
        let path = self.resolve(sub_path)?;
        let meta = std::fs::metadata(&path).map_err(|e| Self::map_io_err(e, &path))?;
        Ok(Self::file_metadata_to_stat(&meta))
    }

    fn readdir(&self, sub_path: &str) -> Result<Vec<String>, VfsError> {
        let path = self.resolve(sub_path)?;
        if path.is_file() {
            return Err(VfsError::not_dir(path.display()));
        }
        let entries = std::fs::read_dir(&path).map_err(|e| Self::map_io_err(e, &path))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::map_io_err(e, &path))?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn unlink(&self, sub_path: &str) -> Result<(), VfsError> {
        self.check_writable()?;
        let path = self.resolve(sub_path)?;
        if path.is_dir() {
            return Err(VfsError::is_dir(path.display()));
        }
        std::fs::remove_file(&path).map_err(|e| Self::map_io_err(e, &path))
    }

    fn mkdir(&self, sub_path: &str, recursive: bool) -> Result<(), VfsError> {
        self.check_writable()?;
        let path = self.resolve(sub_path)?;
        if !recursive && path.exists() {
            return Err(VfsError::exists(path.display()));
        }
        let result = if recursive {
            std::fs::create_dir_all(&path)
        } else {
            std::fs::create_dir(&path)
        };
        result.map_err(|e| Self::map_io_err(e, &path))
    }

    fn rmdir(&self, sub_path: &str, recursive: bool) -> Result<(), VfsError> {
        self.check_writable()?;
        let path = self.resolve(sub_path)?;
        if !path.is_dir() {
            return Err(VfsError::not_dir(path.display()));
        }
        if recursive {
            std::fs::remove_dir_all(&path).map_err(|e| Self::map_io_err(e, &path))
        } else {
            let mut entries = std::fs::read_dir(&path).map_err(|e| Self::map_io_err(e, &path))?;
            if entries.next().is_some() {
                return Err(VfsError::not_empty(path.display()));
            }
            std::fs::remove_dir(&path).map_err(|e| Self::map_io_err(e, &path))
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), VfsError> {
        self.check_writable()?;
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        std::fs::rename(&from_path, &to_path).map_err(|e| Self::map_io_err(e, &from_path))
    }

    fn copy_file(&self, from: &str, to: &str) -> Result<(), VfsError> {
        self.check_writable()?;
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        std::fs::copy(&from_path, &to_path)
            .map(|_| ())
            .map_err(|e| Self::map_io_err(e, &from_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let provider = NativeFsProvider::new(dir.path(), false);
        provider.write_file("a.txt", b"hello").unwrap();
        assert_eq!(provider.read_file("a.txt").unwrap(), b"hello");
    }

    #[test]
    fn read_only_mount_rejects_writes() {
        let dir = tempdir().unwrap();
        let provider = NativeFsProvider::new(dir.path(), true);
        assert!(provider.write_file("a.txt", b"x").is_err());
    }

    #[test]
    fn escaping_the_mount_root_is_rejected() {
        let dir = tempdir().unwrap();
        let provider = NativeFsProvider::new(dir.path(), false);
        assert!(provider.read_file("../../etc/passwd").is_err());
    }

    #[test]
    fn rmdir_non_empty_fails_without_recursive() {
        let dir = tempdir().unwrap();
        let provider = NativeFsProvider::new(dir.path(), false);
        provider.mkdir("sub", false).unwrap();
        provider.write_file("sub/f.txt", b"x").unwrap();
        assert!(provider.rmdir("sub", false).is_err());
        provider.rmdir("sub", true).unwrap();
        assert!(!provider.exists("sub"));
    }
}
