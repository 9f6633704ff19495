// SPDX-License-Identifier: MPL-2.0

//! The physical-frame capability.
//!
//! The frame allocator itself lives outside this crate; it is installed at
//! boot through [`init`] and consulted whenever a virtual memory object
//! commits a page.

use crate::prelude::*;
use crate::vm::Paddr;

/// A handle to one committed physical page frame.
///
/// Handles are cloneable and shared: a frame stays allocated for as long as
/// any object holds a handle to it. Frames are zero-filled when handed out.
pub trait PhysicalFrame: Send + Sync {
    /// The physical address of the frame.
    fn paddr(&self) -> Paddr;

    /// Copies `buf` into the frame at `offset`.
    ///
    /// `offset + buf.len()` must not exceed the page size.
    fn write_bytes(&self, offset: usize, buf: &[u8]);

    /// Copies frame contents at `offset` into `buf`.
    fn read_bytes(&self, offset: usize, buf: &mut [u8]);
}

impl core::fmt::Debug for dyn PhysicalFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn PhysicalFrame")
    }
}

/// A shared handle to a physical frame.
pub type Frame = Arc<dyn PhysicalFrame>;

/// The physical frame allocator, abstracted away from this crate.
pub trait PhysicalFrameSource: Send + Sync {
    /// Allocates one zeroed page frame.
    ///
    /// Fails with `ENOMEM` when physical memory is exhausted.
    fn alloc_frame(&self) -> Result<Frame>;
}

static FRAME_SOURCE: Once<Arc<dyn PhysicalFrameSource>> = Once::new();

/// Installs the global frame source. Called once at boot.
pub(crate) fn init(source: Arc<dyn PhysicalFrameSource>) {
    FRAME_SOURCE.call_once(|| source);
}

pub(crate) fn frame_source() -> Result<&'static Arc<dyn PhysicalFrameSource>> {
    FRAME_SOURCE
        .get()
        .ok_or(Error::with_message(Errno::ENOMEM, "no frame source installed"))
}
