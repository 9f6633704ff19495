// SPDX-License-Identifier: MPL-2.0

//! The memory system calls.
//!
//! Each handler takes the calling process's [`Context`], returns
//! `Result<SyscallReturn>`, and leaves errno conversion to
//! [`syscall_retval`] at the dispatch boundary. Pointer-typed arguments
//! arrive already validated and translated; out-parameters are plain
//! references here.
//!
//! [`Context`]: crate::process::Context

mod mmap;
mod mprotect;
mod munmap;
mod shmallow;
mod shmattach;
mod shmcreate;
mod shmdetach;

pub use mmap::{sys_mmap, MmapArgs, MmapFlags, MmapProt};
pub use mprotect::sys_mprotect;
pub use munmap::sys_munmap;
pub use shmallow::{sys_shmallow, ShmPerms};
pub use shmattach::sys_shmattach;
pub use shmcreate::sys_shmcreate;
pub use shmdetach::sys_shmdetach;

use crate::prelude::*;

/// The value a syscall hands back to the dispatcher on success.
#[derive(Debug)]
pub enum SyscallReturn {
    /// Return a value to the calling process.
    Return(isize),
}

/// Collapses a handler result into the POSIX convention: the returned
/// value on success, the negated errno on failure.
pub fn syscall_retval(result: Result<SyscallReturn>) -> isize {
    match result {
        Ok(SyscallReturn::Return(value)) => value,
        Err(err) => -(err.error() as isize),
    }
}

/// The shared-segment descriptor filled in for userspace by `shmcreate`
/// and `shmattach`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Shm {
    /// Where the segment is mapped in the caller's address space.
    pub ptr: Vaddr,
    /// The segment size in bytes.
    pub size: usize,
    /// The segment's shared identifier.
    pub id: i32,
}
