// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Providers grafted into the VFS tree at a mount point: synchronous
//! virtual providers (`/proc`, `/dev`) and mount providers backed by a real
//! filesystem.

pub mod dev_provider;
pub mod mount_provider;
pub mod native_fs;
pub mod proc_provider;
pub mod virtual_provider;

pub use dev_provider::DevProvider;
pub use mount_provider::MountProvider;
pub use native_fs::NativeFsProvider;
pub use proc_provider::ProcProvider;
pub use virtual_provider::VirtualProvider;
