// SPDX-License-Identifier: MPL-2.0

use super::SyscallReturn;
use crate::prelude::*;
use crate::process::Context;
use crate::vm::shm;

pub fn sys_shmdetach(id: i32, ctx: &Context) -> Result<SyscallReturn> {
    debug!("id = {}", id);

    let object = shm::get_shared(id)?;

    let region = {
        let mut vm = ctx.process.vm();
        let idx = vm
            .regions
            .iter()
            .position(|region| Arc::ptr_eq(region.vmo(), &object))
            .ok_or(Error::new(Errno::ENOENT))?;
        let region = vm.regions.remove(idx);
        vm.used_shmem -= region.size();
        region
    };

    // Dropping the handles unmaps the region and, if ours was the last
    // attachment anywhere, leaves the registry free to purge the segment.
    drop(region);
    drop(object);
    shm::collect(id);

    Ok(SyscallReturn::Return(0))
}
