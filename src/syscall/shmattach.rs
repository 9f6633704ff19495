// SPDX-License-Identifier: MPL-2.0

//! This mod defines the handler to syscall shmattach

use super::{Shm, SyscallReturn};
use crate::prelude::*;
use crate::process::Context;
use crate::vm::perms::VmPerms;
use crate::vm::{is_page_aligned, shm};

pub fn sys_shmattach(id: i32, addr: Vaddr, out: &mut Shm, ctx: &Context) -> Result<SyscallReturn> {
    debug!("id = {}, addr = {:#x}", id, addr);

    if addr != 0 && !is_page_aligned(addr) {
        return_errno_with_message!(Errno::EINVAL, "unaligned fixed address");
    }

    let object = shm::get_shared(id)?;
    let perms = object.shared_perms(ctx.process.pid())?;
    if !perms.contains(VmPerms::READ) {
        // Reads the same as an unknown identifier.
        return_errno!(Errno::ENOENT);
    }

    let space = ctx.process.vm_space();
    let region = if addr != 0 {
        let end = addr
            .checked_add(object.size())
            .ok_or(Error::with_message(Errno::EINVAL, "address range overflows"))?;
        space.map_object_at(object.clone(), perms, addr..end, 0)?
    } else {
        space.map_object(object.clone(), perms)?
    };

    let mut vm = ctx.process.vm();
    vm.used_shmem += region.size();
    *out = Shm {
        ptr: region.start(),
        size: region.size(),
        id,
    };
    vm.regions.push(region);

    Ok(SyscallReturn::Return(0))
}
