// SPDX-License-Identifier: MPL-2.0

use core::ptr;

use crate::prelude::*;
use crate::vm::page_table::PageTable;
use crate::vm::perms::VmPerms;
use crate::vm::range_map::RangeMap;
use crate::vm::region::VmRegion;
use crate::vm::vmo::Vmo;
use crate::vm::Vaddr;

/// A per-process address space.
///
/// The space owns the [`RangeMap`] deciding where mappings land, tracks the
/// live regions placed in it, and drives the process's [`PageTable`] so the
/// hardware mappings follow the logical ones. One mutex serialises every
/// operation; page-table edits happen under it.
pub struct VmSpace {
    start: Vaddr,
    size: usize,
    page_table: Arc<dyn PageTable>,
    inner: Mutex<SpaceInner>,
}

struct SpaceInner {
    range_map: RangeMap,
    regions: Vec<Weak<VmRegion>>,
}

impl VmSpace {
    /// The protection a region gets when the caller has no opinion.
    pub const DEFAULT_PROT: VmPerms = VmPerms::RWX;

    /// Creates a space covering `[start, start + size)`, backed by the
    /// given page table.
    pub fn new(start: Vaddr, size: usize, page_table: Arc<dyn PageTable>) -> Arc<Self> {
        Arc::new(Self {
            start,
            size,
            page_table,
            inner: Mutex::new(SpaceInner {
                range_map: RangeMap::new(start, size),
                regions: Vec::new(),
            }),
        })
    }

    pub fn start(&self) -> Vaddr {
        self.start
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The number of bytes currently allocated out of the space.
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().range_map.used_bytes()
    }

    /// Maps the whole of `vmo` at the lowest free address that fits.
    pub fn map_object(self: &Arc<Self>, vmo: Arc<Vmo>, prot: VmPerms) -> Result<Arc<VmRegion>> {
        let size = vmo.size();
        self.map_object_anywhere(vmo, prot, size, 0)
    }

    /// Maps `size` bytes of `vmo`, starting `offset` bytes into it, at the
    /// lowest free address that fits.
    pub fn map_object_anywhere(
        self: &Arc<Self>,
        vmo: Arc<Vmo>,
        prot: VmPerms,
        size: usize,
        offset: usize,
    ) -> Result<Arc<VmRegion>> {
        if size == 0 || size > vmo.size() {
            return_errno_with_message!(Errno::EINVAL, "mapping does not fit its object");
        }
        let mut inner = self.inner.lock();
        let start = inner.range_map.alloc(size)?;
        self.finish_map(&mut inner, vmo, prot, start, size, offset)
    }

    /// Maps `vmo` at exactly `range`. The request is never relocated; a
    /// conflicting placement fails with `ENOMEM`.
    pub fn map_object_at(
        self: &Arc<Self>,
        vmo: Arc<Vmo>,
        prot: VmPerms,
        range: Range<Vaddr>,
        offset: usize,
    ) -> Result<Arc<VmRegion>> {
        let size = range
            .end
            .checked_sub(range.start)
            .filter(|size| *size > 0)
            .ok_or(Error::with_message(Errno::EINVAL, "malformed range"))?;
        if size > vmo.size() {
            return_errno_with_message!(Errno::EINVAL, "mapping does not fit its object");
        }
        let mut inner = self.inner.lock();
        inner.range_map.alloc_at(range.start, size)?;
        self.finish_map(&mut inner, vmo, prot, range.start, size, offset)
    }

    fn finish_map(
        self: &Arc<Self>,
        inner: &mut SpaceInner,
        vmo: Arc<Vmo>,
        prot: VmPerms,
        start: Vaddr,
        size: usize,
        offset: usize,
    ) -> Result<Arc<VmRegion>> {
        let region = Arc::new(VmRegion::new(
            vmo,
            Arc::downgrade(self),
            start,
            size,
            prot,
            offset,
        ));
        if self.page_table.map(&region).is_err() {
            // The range allocation succeeded, so a mapping failure means
            // the kernel-side allocator came up short. Roll the range back
            // and report exhaustion.
            inner.range_map.free(start, size);
            region.disown();
            return_errno_with_message!(Errno::ENOMEM, "page table mapping failed");
        }
        inner.regions.push(Arc::downgrade(&region));
        trace!("mapped {:#x}..{:#x}", start, start + size);
        Ok(region)
    }

    /// Unmaps `region` from this space. The region's handle stays valid but
    /// inert afterwards.
    pub fn unmap_region(&self, region: &VmRegion) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = inner
            .regions
            .iter()
            .position(|weak| ptr::eq(weak.as_ptr(), region as *const VmRegion))
            .ok_or(Error::new(Errno::ENOENT))?;
        inner.regions.remove(idx);
        inner.range_map.free(region.start(), region.size());
        self.page_table.unmap(region);
        region.disown();
        trace!("unmapped {:#x}..{:#x}", region.start(), region.end());
        Ok(())
    }

    /// Unmaps the region starting exactly at `addr`.
    pub fn unmap_region_at(&self, addr: Vaddr) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = inner
            .regions
            .iter()
            .position(|weak| {
                weak.upgrade()
                    .is_some_and(|region| region.start() == addr)
            })
            .ok_or(Error::new(Errno::ENOENT))?;
        let Some(region) = inner.regions.remove(idx).upgrade() else {
            return_errno!(Errno::ENOENT);
        };
        inner.range_map.free(region.start(), region.size());
        self.page_table.unmap(&region);
        region.disown();
        Ok(())
    }

    /// Returns the region starting exactly at `addr`.
    pub fn get_region(&self, addr: Vaddr) -> Result<Arc<VmRegion>> {
        self.inner
            .lock()
            .regions
            .iter()
            .find_map(|weak| {
                weak.upgrade()
                    .filter(|region| region.start() == addr)
            })
            .ok_or(Error::new(Errno::ENOENT))
    }

    /// Marks `[start, start + size)` used without binding an object to it.
    /// The loader reserves fixed program ranges this way before mapping
    /// segments into them.
    pub fn reserve_region(&self, start: Vaddr, size: usize) -> Result<()> {
        self.inner.lock().range_map.reserve(start, size)
    }

    /// Changes `region`'s protection and republishes it through the page
    /// table.
    pub fn protect_region(&self, region: &VmRegion, prot: VmPerms) -> Result<()> {
        let inner = self.inner.lock();
        if !inner
            .regions
            .iter()
            .any(|weak| ptr::eq(weak.as_ptr(), region as *const VmRegion))
        {
            return_errno!(Errno::ENOENT);
        }
        region.set_prot(prot);
        self.page_table.map(region)
    }
}

impl Drop for VmSpace {
    fn drop(&mut self) {
        // Regions can outlive the space; sever their backrefs so their own
        // drops become no-ops.
        let inner = self.inner.get_mut();
        for weak in inner.regions.drain(..) {
            if let Some(region) = weak.upgrade() {
                region.disown();
            }
        }
    }
}
