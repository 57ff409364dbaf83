// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The `MountProvider` contract: same shape as `VirtualProvider` plus
//! mutation operations, for read-write providers that proxy to a host
//! filesystem.

use lifo_domain::error::VfsError;

use crate::types::Stat;

pub trait MountProvider: Send + Sync {
    fn read_file(&self, sub_path: &str) -> Result<Vec<u8>, VfsError>;

    fn read_file_string(&self, sub_path: &str) -> Result<String, VfsError> {
        let bytes = self.read_file(sub_path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::invalid("not valid utf-8"))
    }

    fn write_file(&self, sub_path: &str, data: &[u8]) -> Result<(), VfsError>;
    fn exists(&self, sub_path: &str) -> bool;
    fn stat(&self, sub_path: &str) -> Result<Stat, VfsError>;
    fn readdir(&self, sub_path: &str) -> Result<Vec<String>, VfsError>;

    fn unlink(&self, sub_path: &str) -> Result<(), VfsError>;
    fn mkdir(&self, sub_path: &str, recursive: bool) -> Result<(), VfsError>;
    fn rmdir(&self, sub_path: &str, recursive: bool) -> Result<(), VfsError>;
    fn rename(&self, from: &str, to: &str) -> Result<(), VfsError>;
    fn copy_file(&self, from: &str, to: &str) -> Result<(), VfsError>;
}
