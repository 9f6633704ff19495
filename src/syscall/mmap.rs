// SPDX-License-Identifier: MPL-2.0

use align_ext::AlignExt;

use super::SyscallReturn;
use crate::prelude::*;
use crate::process::Context;
use crate::vm::is_page_aligned;
use crate::vm::perms::VmPerms;
use crate::vm::vmo::Vmo;

bitflags! {
    /// The `prot` bits of `mmap` and `mprotect`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MmapProt: u32 {
        /// Pages may be read (equivalent to `PROT_READ`).
        const READ  = 1 << 0;
        /// Pages may be written (equivalent to `PROT_WRITE`).
        const WRITE = 1 << 1;
        /// Pages may be executed (equivalent to `PROT_EXEC`).
        const EXEC  = 1 << 2;
    }
}

bitflags! {
    /// The `flags` bits of `mmap`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MmapFlags: u32 {
        /// Place the mapping exactly at `addr` (equivalent to `MAP_FIXED`).
        const FIXED     = 0x10;
        /// No file behind the mapping; pages are zero-filled (equivalent
        /// to `MAP_ANONYMOUS`).
        const ANONYMOUS = 0x20;
    }
}

impl From<MmapProt> for VmPerms {
    fn from(prot: MmapProt) -> VmPerms {
        let mut perms = VmPerms::empty();
        if prot.contains(MmapProt::READ) {
            perms |= VmPerms::READ;
        }
        if prot.contains(MmapProt::WRITE) {
            perms |= VmPerms::WRITE;
        }
        if prot.contains(MmapProt::EXEC) {
            perms |= VmPerms::EXEC;
        }
        perms
    }
}

/// The argument block of `mmap`, as userspace passes it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MmapArgs {
    pub addr: Vaddr,
    pub length: usize,
    pub prot: u32,
    pub flags: u32,
    pub fd: i32,
    pub offset: usize,
}

pub fn sys_mmap(args: MmapArgs, ctx: &Context) -> Result<SyscallReturn> {
    let prot = MmapProt::from_bits_truncate(args.prot);
    let flags = MmapFlags::from_bits_truncate(args.flags);
    debug!(
        "addr = {:#x}, length = {:#x}, prot = {:?}, flags = {:?}, fd = {}, offset = {:#x}",
        args.addr, args.length, prot, flags, args.fd, args.offset
    );

    if args.length == 0 {
        return_errno_with_message!(Errno::EINVAL, "zero-length mapping");
    }
    if !is_page_aligned(args.offset) {
        return_errno_with_message!(Errno::EINVAL, "unaligned file offset");
    }
    let length = args.length.align_up(PAGE_SIZE);

    let vmo = if flags.contains(MmapFlags::ANONYMOUS) {
        Vmo::alloc_anonymous(length)?
    } else {
        let file = ctx.process.files().get(args.fd)?;
        let inode = file.inode().ok_or(Error::with_message(
            Errno::EBADF,
            "descriptor is not a mappable file",
        ))?;
        Vmo::make_for_inode(inode)
    };
    let perms = VmPerms::from(prot);
    let space = ctx.process.vm_space();

    let region = if flags.contains(MmapFlags::FIXED) {
        if args.addr == 0 {
            return_errno_with_message!(Errno::EINVAL, "fixed mapping at the null page");
        }
        if !is_page_aligned(args.addr) {
            return_errno_with_message!(Errno::EINVAL, "unaligned fixed address");
        }
        let end = args
            .addr
            .checked_add(length)
            .ok_or(Error::with_message(Errno::ENOMEM, "address range overflows"))?;
        space.map_object_at(vmo, perms, args.addr..end, args.offset)?
    } else {
        if args.addr != 0 {
            warn!("mmap: address hint {:#x} without MAP_FIXED is ignored", args.addr);
        }
        space.map_object_anywhere(vmo, perms, length, args.offset)?
    };

    let mut vm = ctx.process.vm();
    vm.used_pmem += region.size();
    let start = region.start();
    vm.regions.push(region);

    Ok(SyscallReturn::Return(start as isize))
}
