// SPDX-License-Identifier: MPL-2.0

use core::mem;

use crate::prelude::*;
use crate::vm::perms::VmPerms;
use crate::vm::space::VmSpace;
use crate::vm::vmo::Vmo;
use crate::vm::Vaddr;

/// A placed instance of a [`Vmo`] in one address space.
///
/// Regions are created by [`VmSpace::map_object`] and friends, never
/// directly. A region covers `[start, start + size)` with a protection the
/// space can update in place; `offset` is the byte offset into the object
/// at which the mapping begins (non-zero for file mappings).
///
/// A region holds a weak reference back to its space. Dropping the last
/// handle to a still-mapped region unmaps it; once the space itself has
/// been torn down, the backref is cleared and dropping the region does
/// nothing.
pub struct VmRegion {
    vmo: Arc<Vmo>,
    space: Mutex<Weak<VmSpace>>,
    start: Vaddr,
    size: usize,
    offset: usize,
    prot: Mutex<VmPerms>,
}

impl core::fmt::Debug for VmRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VmRegion")
            .field("start", &self.start)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .finish()
    }
}

impl VmRegion {
    pub(crate) fn new(
        vmo: Arc<Vmo>,
        space: Weak<VmSpace>,
        start: Vaddr,
        size: usize,
        prot: VmPerms,
        offset: usize,
    ) -> Self {
        Self {
            vmo,
            space: Mutex::new(space),
            start,
            size,
            offset,
            prot: Mutex::new(prot),
        }
    }

    /// The backing object.
    pub fn vmo(&self) -> &Arc<Vmo> {
        &self.vmo
    }

    /// The first address of the region.
    pub fn start(&self) -> Vaddr {
        self.start
    }

    /// The region's size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the last address of the region.
    pub fn end(&self) -> Vaddr {
        self.start + self.size
    }

    /// The byte offset into the backing object where the mapping starts.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The current protection.
    pub fn prot(&self) -> VmPerms {
        *self.prot.lock()
    }

    pub(crate) fn set_prot(&self, prot: VmPerms) {
        *self.prot.lock() = prot;
    }

    /// Severs the link back to the owning space. Later drops of the region
    /// no longer touch the space.
    pub(crate) fn disown(&self) {
        *self.space.lock() = Weak::new();
    }

    fn take_space(&self) -> Option<Arc<VmSpace>> {
        mem::take(&mut *self.space.lock()).upgrade()
    }
}

impl Drop for VmRegion {
    fn drop(&mut self) {
        if let Some(space) = self.take_space() {
            let _ = space.unmap_region(self);
        }
    }
}
