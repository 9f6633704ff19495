// SPDX-License-Identifier: MPL-2.0

//! In-memory capability implementations backing the test suite.

use alloc::collections::BTreeSet;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::fs::{FileLike, Inode};
use crate::prelude::*;
use crate::process::{Context, Pid, Process, ProcessRegistry};
use crate::vm::frame::{Frame, PhysicalFrame, PhysicalFrameSource};
use crate::vm::page_table::PageTable;
use crate::vm::perms::VmPerms;
use crate::vm::region::VmRegion;
use crate::vm::space::VmSpace;
use crate::vm::Paddr;

/// A heap-backed page frame.
struct TestFrame {
    paddr: Paddr,
    bytes: Mutex<Vec<u8>>,
}

impl PhysicalFrame for TestFrame {
    fn paddr(&self) -> Paddr {
        self.paddr
    }

    fn write_bytes(&self, offset: usize, buf: &[u8]) {
        self.bytes.lock()[offset..offset + buf.len()].copy_from_slice(buf);
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.bytes.lock()[offset..offset + buf.len()]);
    }
}

struct TestFrameSource {
    next_paddr: AtomicUsize,
}

impl PhysicalFrameSource for TestFrameSource {
    fn alloc_frame(&self) -> Result<Frame> {
        let paddr = self.next_paddr.fetch_add(PAGE_SIZE, Ordering::Relaxed);
        Ok(Arc::new(TestFrame {
            paddr,
            bytes: Mutex::new(vec![0u8; PAGE_SIZE]),
        }))
    }
}

/// One page-table edit observed by a [`RecordingPageTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PtOp {
    Map {
        start: Vaddr,
        size: usize,
        prot: VmPerms,
    },
    Unmap {
        start: Vaddr,
        size: usize,
    },
}

/// A page table that records every edit instead of touching hardware.
pub(crate) struct RecordingPageTable {
    pub ops: Mutex<Vec<PtOp>>,
    fail_next_map: AtomicBool,
}

impl RecordingPageTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
            fail_next_map: AtomicBool::new(false),
        })
    }

    /// Makes the next `map` call fail, as a frame-allocator shortfall
    /// would.
    pub fn fail_next_map(&self) {
        self.fail_next_map.store(true, Ordering::Relaxed);
    }
}

impl PageTable for RecordingPageTable {
    fn map(&self, region: &VmRegion) -> Result<()> {
        if self.fail_next_map.swap(false, Ordering::Relaxed) {
            return_errno!(Errno::ENOMEM);
        }
        self.ops.lock().push(PtOp::Map {
            start: region.start(),
            size: region.size(),
            prot: region.prot(),
        });
        Ok(())
    }

    fn unmap(&self, region: &VmRegion) {
        self.ops.lock().push(PtOp::Unmap {
            start: region.start(),
            size: region.size(),
        });
    }
}

/// An inode over an in-memory byte vector.
pub(crate) struct TestInode {
    data: Vec<u8>,
}

impl TestInode {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Inode for TestInode {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.data.len() {
            return Ok(0);
        }
        let nread = buf.len().min(self.data.len() - offset);
        buf[..nread].copy_from_slice(&self.data[offset..offset + nread]);
        Ok(nread)
    }
}

/// An inode whose reads always fail.
pub(crate) struct FailingInode {
    size: usize,
}

impl FailingInode {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Inode for FailingInode {
    fn size(&self) -> usize {
        self.size
    }

    fn read_at(&self, _offset: usize, _buf: &mut [u8]) -> Result<usize> {
        return_errno_with_message!(Errno::EIO, "disk read failed");
    }
}

/// A file descriptor target that resolves to an inode.
pub(crate) struct InodeFile {
    inode: Arc<dyn Inode>,
}

impl InodeFile {
    pub fn new(inode: impl Inode + 'static) -> Self {
        Self {
            inode: Arc::new(inode),
        }
    }
}

impl FileLike for InodeFile {
    fn inode(&self) -> Option<Arc<dyn Inode>> {
        Some(self.inode.clone())
    }
}

/// A file descriptor target with no backing inode.
pub(crate) struct PipeFile;

impl FileLike for PipeFile {
    fn inode(&self) -> Option<Arc<dyn Inode>> {
        None
    }
}

struct TestProcessRegistry {
    pids: Mutex<BTreeSet<Pid>>,
}

impl ProcessRegistry for TestProcessRegistry {
    fn process_exists(&self, pid: Pid) -> bool {
        self.pids.lock().contains(&pid)
    }
}

static TEST_REGISTRY: Once<Arc<TestProcessRegistry>> = Once::new();

/// Installs the test capabilities. Tests may call this any number of
/// times; only the first call in the process does anything.
pub(crate) fn init_for_test() {
    let registry = TEST_REGISTRY
        .call_once(|| {
            Arc::new(TestProcessRegistry {
                pids: Mutex::new(BTreeSet::new()),
            })
        })
        .clone();
    crate::init(
        Arc::new(TestFrameSource {
            next_paddr: AtomicUsize::new(0x8000_0000),
        }),
        registry,
    );
}

/// Marks `pid` as a live process.
pub(crate) fn register_pid(pid: Pid) {
    init_for_test();
    TEST_REGISTRY.get().unwrap().pids.lock().insert(pid);
}

/// A fresh space over `[start, start + size)` with a recording page table.
pub(crate) fn new_space(start: Vaddr, size: usize) -> (Arc<VmSpace>, Arc<RecordingPageTable>) {
    init_for_test();
    let page_table = RecordingPageTable::new();
    (VmSpace::new(start, size, page_table.clone()), page_table)
}

/// A fresh registered process with its own space and page table.
pub(crate) fn new_process(
    pid: Pid,
    start: Vaddr,
    size: usize,
) -> (Context, Arc<RecordingPageTable>) {
    register_pid(pid);
    let (space, page_table) = new_space(start, size);
    (
        Context {
            process: Process::new(pid, space),
        },
        page_table,
    )
}
