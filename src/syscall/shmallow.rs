// SPDX-License-Identifier: MPL-2.0

//! This mod defines the handler to syscall shmallow

use super::SyscallReturn;
use crate::prelude::*;
use crate::process::{process_registry, Context, Pid};
use crate::vm::perms::VmPerms;
use crate::vm::shm;

bitflags! {
    /// Permission bits accepted by `shmallow`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShmPerms: u32 {
        /// The grantee may attach the segment for reading.
        const READ  = 1 << 0;
        /// The grantee may attach the segment for writing.
        const WRITE = 1 << 1;
        /// The grantee may grant access onwards.
        const SHARE = 1 << 2;
    }
}

pub fn sys_shmallow(id: i32, pid: Pid, perms: u32, _ctx: &Context) -> Result<SyscallReturn> {
    let perms = ShmPerms::from_bits_truncate(perms);
    debug!("id = {}, pid = {}, perms = {:?}", id, pid, perms);

    // TODO: re-delegation of segments the caller did not create
    if perms.contains(ShmPerms::SHARE) {
        return_errno_with_message!(Errno::EINVAL, "re-delegation is not supported");
    }
    if !perms.intersects(ShmPerms::READ | ShmPerms::WRITE) {
        return_errno_with_message!(Errno::EINVAL, "grant carries no access");
    }
    if perms.contains(ShmPerms::WRITE) && !perms.contains(ShmPerms::READ) {
        return_errno_with_message!(Errno::EINVAL, "write-only grant");
    }
    if !process_registry()?.process_exists(pid) {
        return_errno_with_message!(Errno::EINVAL, "no such process");
    }

    let object = shm::get_shared(id)?;

    let mut granted = VmPerms::empty();
    if perms.contains(ShmPerms::READ) {
        granted |= VmPerms::READ;
    }
    if perms.contains(ShmPerms::WRITE) {
        granted |= VmPerms::WRITE;
    }
    object.share(pid, granted)?;

    Ok(SyscallReturn::Return(0))
}
