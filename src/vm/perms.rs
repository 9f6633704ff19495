// SPDX-License-Identifier: MPL-2.0

use crate::prelude::*;

bitflags! {
    /// The memory access permissions of a mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VmPerms: u32 {
        /// Readable.
        const READ  = 1 << 0;
        /// Writable.
        const WRITE = 1 << 1;
        /// Executable.
        const EXEC  = 1 << 2;
        /// Copy-on-write; the page table maps the range read-only and the
        /// fault handler duplicates frames on write.
        const COW   = 1 << 3;

        /// Read and write, the permissions of a freshly created shared
        /// segment.
        const RW    = Self::READ.bits() | Self::WRITE.bits();
        /// Read, write and execute.
        const RWX   = Self::READ.bits() | Self::WRITE.bits() | Self::EXEC.bits();
    }
}
