// SPDX-License-Identifier: MPL-2.0

//! Virtual memory objects: the sources of page frames behind regions.

use align_ext::AlignExt;
use hashbrown::HashMap;

use crate::fs::Inode;
use crate::prelude::*;
use crate::process::Pid;
use crate::vm::frame::{frame_source, Frame};
use crate::vm::perms::VmPerms;
use crate::vm::shm;

/// A virtual memory object: a page-aligned run of memory pages that one or
/// more regions can map.
///
/// Two kinds of backing exist:
///  * **Anonymous** — pages are zero-filled and committed lazily. An
///    anonymous object can be shared across processes: the first call to
///    [`share`](Self::share) registers it in the global registry under a
///    fresh identifier, and a per-process permissions table controls who
///    may attach it.
///  * **Inode** — pages are read from a filesystem inode on first commit.
///    Writes through a writable mapping stay dirty in memory for the
///    lifetime of the mapping; nothing is written back.
pub struct Vmo {
    size: usize,
    /// Committed frames, keyed by page index within the object.
    pages: Mutex<BTreeMap<usize, Frame>>,
    backing: VmoBacking,
}

enum VmoBacking {
    Anonymous(AnonymousState),
    Inode(InodeState),
}

impl core::fmt::Debug for Vmo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vmo").field("size", &self.size).finish()
    }
}

struct AnonymousState {
    /// Assigned under the registry lock on first share; never changes
    /// afterwards.
    shm_id: Once<i32>,
    /// Which processes may attach this object, and with what permissions.
    /// The lowest lock in the subsystem: held only for table reads and
    /// writes, never while calling out.
    shared_perms: Mutex<HashMap<Pid, VmPerms>>,
}

struct InodeState {
    inode: Arc<dyn Inode>,
}

impl Vmo {
    /// Allocates an anonymous object covering `size` bytes, rounded up to
    /// the page size. No frames are committed up front.
    pub fn alloc_anonymous(size: usize) -> Result<Arc<Self>> {
        if size == 0 {
            return_errno_with_message!(Errno::EINVAL, "zero-sized anonymous object");
        }
        Ok(Arc::new(Self {
            size: size.align_up(PAGE_SIZE),
            pages: Mutex::new(BTreeMap::new()),
            backing: VmoBacking::Anonymous(AnonymousState {
                shm_id: Once::new(),
                shared_perms: Mutex::new(HashMap::new()),
            }),
        }))
    }

    /// Creates an object backed by `inode`, sized to the inode's size
    /// rounded up to the page size.
    pub fn make_for_inode(inode: Arc<dyn Inode>) -> Arc<Self> {
        Arc::new(Self {
            size: inode.size().align_up(PAGE_SIZE),
            pages: Mutex::new(BTreeMap::new()),
            backing: VmoBacking::Inode(InodeState { inode }),
        })
    }

    /// The object's size in bytes. Always a multiple of the page size.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.backing, VmoBacking::Anonymous(_))
    }

    /// The shared identifier, once [`share`](Self::share) has assigned one.
    pub fn shm_id(&self) -> Option<i32> {
        match &self.backing {
            VmoBacking::Anonymous(state) => state.shm_id.get().copied(),
            VmoBacking::Inode(_) => None,
        }
    }

    /// Returns the committed frame for page `page_idx`, committing it on
    /// first touch.
    ///
    /// Anonymous pages come back zero-filled from the frame source. Inode
    /// pages are filled from the inode; a read past the end of the file
    /// leaves the tail of the page zeroed.
    pub fn commit_page(&self, page_idx: usize) -> Result<Frame> {
        if page_idx * PAGE_SIZE >= self.size {
            return_errno_with_message!(Errno::EINVAL, "page index outside the object");
        }
        let mut pages = self.pages.lock();
        if let Some(frame) = pages.get(&page_idx) {
            return Ok(frame.clone());
        }

        let frame = frame_source()?.alloc_frame()?;
        if let VmoBacking::Inode(state) = &self.backing {
            let mut buf = vec![0u8; PAGE_SIZE];
            let nread = state.inode.read_at(page_idx * PAGE_SIZE, &mut buf)?;
            frame.write_bytes(0, &buf[..nread]);
        }
        pages.insert(page_idx, frame.clone());
        trace!("committed page {} of a {}-byte object", page_idx, self.size);
        Ok(frame)
    }

    /// Grants `pid` access to this object with `perms`, overwriting any
    /// prior grant for the same process.
    ///
    /// The first call registers the object in the shared-object registry
    /// and assigns its identifier; the identifier is returned on every
    /// call. Only anonymous objects can be shared.
    pub fn share(self: &Arc<Self>, pid: Pid, perms: VmPerms) -> Result<i32> {
        let state = match &self.backing {
            VmoBacking::Anonymous(state) => state,
            VmoBacking::Inode(_) => {
                return_errno_with_message!(Errno::EINVAL, "only anonymous objects can be shared")
            }
        };
        let id = shm::register(self)?;
        state.shared_perms.lock().insert(pid, perms);
        Ok(id)
    }

    /// The permissions granted to `pid`, or `ENOENT` if the process has no
    /// grant.
    pub fn shared_perms(&self, pid: Pid) -> Result<VmPerms> {
        let state = match &self.backing {
            VmoBacking::Anonymous(state) => state,
            VmoBacking::Inode(_) => return_errno!(Errno::ENOENT),
        };
        state
            .shared_perms
            .lock()
            .get(&pid)
            .copied()
            .ok_or(Error::new(Errno::ENOENT))
    }

    pub(crate) fn set_shm_id(&self, id: i32) {
        if let VmoBacking::Anonymous(state) = &self.backing {
            state.shm_id.call_once(|| id);
        }
    }
}
