// SPDX-License-Identifier: MPL-2.0

use crate::prelude::*;
use crate::vm::region::VmRegion;

/// The per-address-space MMU capability.
///
/// One page table backs each [`VmSpace`](crate::vm::VmSpace); the space
/// calls back into it whenever the logical region layout changes so the
/// hardware tables stay consistent. Calls are always made under the space
/// lock.
///
/// The implementation is free to upgrade a write-only protection to imply
/// read where the hardware cannot express write-without-read.
pub trait PageTable: Send + Sync {
    /// Publishes the region's range with its current protection.
    ///
    /// Also used to republish after a protection change.
    fn map(&self, region: &VmRegion) -> Result<()>;

    /// Removes the region's range from the tables.
    fn unmap(&self, region: &VmRegion);
}
