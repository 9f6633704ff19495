// SPDX-License-Identifier: MPL-2.0

//! The process-side view of the memory subsystem.

use crate::fs::FileTable;
use crate::prelude::*;
use crate::vm::region::VmRegion;
use crate::vm::space::VmSpace;

/// A process identifier.
pub type Pid = u32;

/// The task-manager capability: answers whether a pid names a live
/// process. Used to validate the target of a permission grant.
pub trait ProcessRegistry: Send + Sync {
    fn process_exists(&self, pid: Pid) -> bool;
}

static PROCESS_REGISTRY: Once<Arc<dyn ProcessRegistry>> = Once::new();

pub(crate) fn init(registry: Arc<dyn ProcessRegistry>) {
    PROCESS_REGISTRY.call_once(|| registry);
}

pub(crate) fn process_registry() -> Result<&'static Arc<dyn ProcessRegistry>> {
    PROCESS_REGISTRY
        .get()
        .ok_or(Error::with_message(Errno::EINVAL, "no process registry installed"))
}

/// The memory state a process carries: its mapped regions and the usage
/// counters reported to userspace.
///
/// `used_pmem` counts private mappings, `used_shmem` shared anonymous
/// ones. Only the syscall layer updates either.
pub struct ProcessVm {
    pub(crate) regions: Vec<Arc<VmRegion>>,
    pub(crate) used_pmem: usize,
    pub(crate) used_shmem: usize,
}

/// One process, as far as memory management is concerned: an address
/// space, the regions mapped into it, open files, and usage counters.
pub struct Process {
    pid: Pid,
    vm_space: Arc<VmSpace>,
    vm: Mutex<ProcessVm>,
    files: Mutex<FileTable>,
}

impl Process {
    pub fn new(pid: Pid, vm_space: Arc<VmSpace>) -> Arc<Self> {
        Arc::new(Self {
            pid,
            vm_space,
            vm: Mutex::new(ProcessVm {
                regions: Vec::new(),
                used_pmem: 0,
                used_shmem: 0,
            }),
            files: Mutex::new(FileTable::new()),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn vm_space(&self) -> &Arc<VmSpace> {
        &self.vm_space
    }

    /// Locks and returns the process's memory state.
    pub fn vm(&self) -> MutexGuard<'_, ProcessVm> {
        self.vm.lock()
    }

    pub fn files(&self) -> MutexGuard<'_, FileTable> {
        self.files.lock()
    }

    /// Bytes of private mappings charged to this process.
    pub fn used_pmem(&self) -> usize {
        self.vm.lock().used_pmem
    }

    /// Bytes of shared anonymous mappings charged to this process.
    pub fn used_shmem(&self) -> usize {
        self.vm.lock().used_shmem
    }
}

/// The execution context a syscall runs in.
pub struct Context {
    pub process: Arc<Process>,
}
