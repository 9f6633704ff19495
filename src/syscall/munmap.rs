// SPDX-License-Identifier: MPL-2.0

use super::SyscallReturn;
use crate::prelude::*;
use crate::process::Context;
use crate::vm::{is_page_aligned, shm};

pub fn sys_munmap(addr: Vaddr, length: usize, ctx: &Context) -> Result<SyscallReturn> {
    debug!("addr = {:#x}, length = {:#x}", addr, length);

    if !is_page_aligned(addr) {
        return_errno_with_message!(Errno::EINVAL, "unaligned address");
    }

    // Only a whole region can be released; carving pieces out of a
    // mapping is not supported.
    let region = {
        let mut vm = ctx.process.vm();
        let Some(idx) = vm
            .regions
            .iter()
            .position(|region| region.start() == addr && region.size() == length)
        else {
            warn!(
                "munmap for pid {} failed: no region at {:#x} with length {:#x}",
                ctx.process.pid(),
                addr,
                length
            );
            return_errno!(Errno::ENOENT);
        };
        let region = vm.regions.remove(idx);
        if region.vmo().shm_id().is_some() {
            vm.used_shmem -= region.size();
        } else {
            vm.used_pmem -= region.size();
        }
        region
    };

    let id = region.vmo().shm_id();
    drop(region);
    if let Some(id) = id {
        shm::collect(id);
    }

    Ok(SyscallReturn::Return(0))
}
