// SPDX-License-Identifier: MPL-2.0

//! Filesystem capabilities consumed by the memory subsystem.

use crate::prelude::*;

/// The inode capability behind inode-backed memory objects.
///
/// The filesystem implements this; the memory subsystem only ever pulls
/// whole pages out of it when an inode-backed object commits a page.
pub trait Inode: Send + Sync {
    /// The file size in bytes.
    fn size(&self) -> usize;

    /// Reads up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes read. Reading at or past the end of the file
    /// returns zero.
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize>;
}

/// An open file as seen through a file descriptor.
///
/// Only files that resolve to an inode can be memory-mapped; everything
/// else (pipes, sockets, devices without backing storage) reports `None`.
pub trait FileLike: Send + Sync {
    fn inode(&self) -> Option<Arc<dyn Inode>>;
}

impl core::fmt::Debug for dyn FileLike {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn FileLike")
    }
}

/// A process's table of open files.
pub struct FileTable {
    files: Vec<Option<Arc<dyn FileLike>>>,
}

impl FileTable {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Installs `file` in the lowest free slot and returns its descriptor.
    pub fn install(&mut self, file: Arc<dyn FileLike>) -> i32 {
        for (fd, slot) in self.files.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(file);
                return fd as i32;
            }
        }
        self.files.push(Some(file));
        (self.files.len() - 1) as i32
    }

    /// Resolves a descriptor, failing with `EBADF` for a closed or
    /// out-of-range one.
    pub fn get(&self, fd: i32) -> Result<Arc<dyn FileLike>> {
        usize::try_from(fd)
            .ok()
            .and_then(|fd| self.files.get(fd))
            .and_then(|slot| slot.clone())
            .ok_or(Error::new(Errno::EBADF))
    }

    /// Closes a descriptor. Closing an already-closed descriptor fails
    /// with `EBADF`.
    pub fn close(&mut self, fd: i32) -> Result<()> {
        let slot = usize::try_from(fd)
            .ok()
            .and_then(|fd| self.files.get_mut(fd))
            .ok_or(Error::new(Errno::EBADF))?;
        slot.take().map(|_| ()).ok_or(Error::new(Errno::EBADF))
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}
