// SPDX-License-Identifier: MPL-2.0

use super::{MmapProt, SyscallReturn};
use crate::prelude::*;
use crate::process::Context;
use crate::vm::is_page_aligned;
use crate::vm::perms::VmPerms;

pub fn sys_mprotect(addr: Vaddr, length: usize, prot: u32, ctx: &Context) -> Result<SyscallReturn> {
    let prot = MmapProt::from_bits_truncate(prot);
    debug!("addr = {:#x}, length = {:#x}, prot = {:?}", addr, length, prot);

    if !is_page_aligned(addr) {
        return_errno_with_message!(Errno::EINVAL, "unaligned address");
    }

    // Protection changes apply to whole regions only.
    let vm = ctx.process.vm();
    let Some(region) = vm
        .regions
        .iter()
        .find(|region| region.start() == addr && region.size() == length)
        .cloned()
    else {
        warn!(
            "mprotect for pid {} failed: no region at {:#x} with length {:#x}",
            ctx.process.pid(),
            addr,
            length
        );
        return_errno!(Errno::ENOENT);
    };

    ctx.process
        .vm_space()
        .protect_region(&region, VmPerms::from(prot))?;

    Ok(SyscallReturn::Return(0))
}
