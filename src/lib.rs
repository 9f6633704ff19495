// SPDX-License-Identifier: MPL-2.0

//! The virtual memory subsystem of the Pelican kernel.
//!
//! This crate owns the per-process address-space layer: the free/used range
//! allocator behind every address space, the virtual memory objects
//! (anonymous and inode-backed) that provide page frames, the region
//! descriptors binding objects into address spaces, and the memory system
//! calls (`shmcreate`, `shmattach`, `shmdetach`, `shmallow`, `mmap`,
//! `munmap`, `mprotect`) built on top of them.
//!
//! The pieces of the kernel this crate talks to are injected as
//! capabilities: the MMU driver as [`vm::PageTable`], the physical frame
//! allocator as [`vm::PhysicalFrameSource`], the filesystem as
//! [`fs::Inode`], and the task manager as [`process::ProcessRegistry`].
//! This keeps the crate independent of the hardware layers and lets the
//! whole subsystem run under the host test harness.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod error;
pub mod fs;
pub mod process;
mod prelude;
pub mod syscall;
#[cfg(test)]
mod test_util;
pub mod vm;

pub use error::{Errno, Error, Result};

use alloc::sync::Arc;

/// Initializes the subsystem. Called once at boot, before any address space
/// is constructed.
pub fn init(
    frame_source: Arc<dyn vm::PhysicalFrameSource>,
    process_registry: Arc<dyn process::ProcessRegistry>,
) {
    vm::frame::init(frame_source);
    vm::shm::init();
    process::init(process_registry);
}
