// SPDX-License-Identifier: MPL-2.0

//! This mod defines the handler to syscall shmcreate

use super::{Shm, SyscallReturn};
use crate::prelude::*;
use crate::process::Context;
use crate::vm::perms::VmPerms;
use crate::vm::vmo::Vmo;
use crate::vm::{is_page_aligned, shm};

pub fn sys_shmcreate(addr: Vaddr, size: usize, out: &mut Shm, ctx: &Context) -> Result<SyscallReturn> {
    debug!("addr = {:#x}, size = {:#x}", addr, size);

    if size == 0 {
        return_errno_with_message!(Errno::EINVAL, "zero-sized segment");
    }
    if addr != 0 && !is_page_aligned(addr) {
        return_errno_with_message!(Errno::EINVAL, "unaligned fixed address");
    }

    let object = Vmo::alloc_anonymous(size)?;
    let id = object.share(ctx.process.pid(), VmPerms::RW)?;

    let space = ctx.process.vm_space();
    let mapped = if addr != 0 {
        match addr.checked_add(object.size()) {
            Some(end) => space.map_object_at(object.clone(), VmPerms::RW, addr..end, 0),
            None => Err(Error::with_message(Errno::EINVAL, "address range overflows")),
        }
    } else {
        space.map_object(object.clone(), VmPerms::RW)
    };
    let region = match mapped {
        Ok(region) => region,
        Err(err) => {
            // The segment was registered but never handed out; let the
            // registry drop it again.
            drop(object);
            shm::collect(id);
            return Err(err);
        }
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
