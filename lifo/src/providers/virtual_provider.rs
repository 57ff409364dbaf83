// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The `VirtualProvider` contract: synchronous, pure-computational,
//! read-only (and sometimes write-through) synthetic subtrees such as
//! `/proc` and `/dev`. Every method receives a sub-path relative to the
//! provider's mount root.

use lifo_domain::error::VfsError;

use crate::types::Stat;

pub trait VirtualProvider: Send + Sync {
    fn read_file(&self, sub_path: &str) -> Result<Vec<u8>, VfsError>;

    fn read_file_string(&self, sub_path: &str) -> Result<String, VfsError> {
        let bytes = self.read_file(sub_path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::invalid("not valid utf-8"))
    }

    /// Providers that cannot accept writes keep the default, which fails
    /// with `EINVAL`.
    fn write_file(&self, _sub_path: &str, _data: &[u8]) -> Result<(), VfsError> {
        Err(VfsError::invalid("provider is read-only"))
    }

    fn exists(&self, sub_path: &str) -> bool;

    fn stat(&self, sub_path: &str) -> Result<Stat, VfsError>;

    fn readdir(&self, sub_path: &str) -> Result<Vec<String>, VfsError>;
}
