// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The closed VFS error set (spec §4.E/§7): every filesystem-shaped failure
//! in Lifo carries one of these symbolic codes plus a detail message of the
//! form `"<code>: <detail>"`.

use thiserror::Error;

/// Symbolic error code attached to every VFS-shaped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ENoEnt,
    EExist,
    ENotDir,
    EIsDir,
    ENotEmpty,
    EInval,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ENoEnt => "ENOENT",
            ErrorCode::EExist => "EEXIST",
            ErrorCode::ENotDir => "ENOTDIR",
            ErrorCode::EIsDir => "EISDIR",
            ErrorCode::ENotEmpty => "ENOTEMPTY",
            ErrorCode::EInval => "EINVAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VFS operation failure: a symbolic code plus a human-readable detail.
///
/// `Display` renders as `"<code>: <detail>"`, matching spec §4.E's wire
/// shape exactly so callers can surface it to a shell's stderr unmodified.
#[derive(Debug, Error, Clone)]
#[error("{code}: {detail}")]
pub struct VfsError {
    pub code: ErrorCode,
    pub detail: String,
}

impl VfsError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::ENoEnt, format!("no such file or directory: {path}"))
    }

    pub fn exists(path: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::EExist, format!("already exists: {path}"))
    }

    pub fn not_dir(path: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::ENotDir, format!("not a directory: {path}"))
    }

    pub fn is_dir(path: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::EIsDir, format!("is a directory: {path}"))
    }

    pub fn not_empty(path: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::ENotEmpty, format!("directory not empty: {path}"))
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::EInval, detail)
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
