//! # Reaching Frame Contents
//!
//! The allocator writes fill patterns into frames it releases and hands out,
//! so it needs a way to turn a physical frame address into a pointer in the
//! current address space. [`FrameMemory`] is that seam:
//!
//! - [`HhdmFrameMemory`]: the kernel's higher-half direct map, every physical
//!   address is visible at `HHDM_BASE + pa`.
//! - [`HeapFrameMemory`]: a page-aligned heap buffer standing in for a slice
//!   of physical memory, for hosted tests and tools.

use crate::PhysicalAddress;
use crate::address::{FRAME_BYTES, FRAME_SIZE};
use alloc::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use core::ptr::NonNull;
use kernel_info::memory::HHDM_BASE;

/// Converts frame addresses to writable pointers.
///
/// # Safety
/// For every frame address of the range an allocator manages, `frame_ptr`
/// must return a pointer valid for reads and writes of one whole frame, and
/// distinct frames must not overlap.
pub unsafe trait FrameMemory: Sync {
    fn frame_ptr(&self, frame: PhysicalAddress) -> *mut u8;
}

/// [`FrameMemory`] through the kernel's higher-half direct map.
///
/// The HHDM must be present and cover the allocator's whole managed range
/// before the allocator is initialized.
#[derive(Debug, Copy, Clone, Default)]
pub struct HhdmFrameMemory;

unsafe impl FrameMemory for HhdmFrameMemory {
    #[inline]
    fn frame_ptr(&self, frame: PhysicalAddress) -> *mut u8 {
        (HHDM_BASE + frame.as_u64()) as *mut u8
    }
}

/// A zeroed, frame-aligned heap buffer posing as physical memory
/// `[base, base + frames * FRAME_SIZE)`.
pub struct HeapFrameMemory {
    base: PhysicalAddress,
    frames: usize,
    buf: NonNull<u8>,
}

// Safety: the buffer is owned; concurrent access to distinct frames is
// coordinated by the allocator that owns this memory.
unsafe impl Send for HeapFrameMemory {}
unsafe impl Sync for HeapFrameMemory {}

impl HeapFrameMemory {
    /// # Panics
    /// If `frames` is zero, `base` is not frame-aligned, or the buffer size
    /// overflows.
    #[must_use]
    pub fn new(base: PhysicalAddress, frames: usize) -> Self {
        assert!(frames > 0, "heap frame memory needs at least one frame");
        assert!(base.is_frame_aligned(), "heap frame memory base {base} is misaligned");
        let layout = Self::layout(frames);
        // SAFETY: layout has non-zero size.
        let Some(buf) = NonNull::new(unsafe { alloc_zeroed(layout) }) else {
            handle_alloc_error(layout)
        };
        Self { base, frames, buf }
    }

    fn layout(frames: usize) -> Layout {
        frames
            .checked_mul(FRAME_BYTES)
            .and_then(|size| Layout::from_size_align(size, FRAME_BYTES).ok())
            .unwrap_or_else(|| panic!("heap frame memory of {frames} frames is too large"))
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// First address past the buffer.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> PhysicalAddress {
        self.base + self.frames as u64 * FRAME_SIZE
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, frame: PhysicalAddress) -> bool {
        frame.is_frame_aligned() && self.base <= frame && frame < self.limit()
    }

    /// Borrow the bytes of one frame.
    ///
    /// # Safety
    /// Nothing may write the frame while the slice is alive, including the
    /// allocator releasing or handing it out.
    ///
    /// # Panics
    /// If `frame` is not a frame of this buffer.
    #[must_use]
    pub unsafe fn frame(&self, frame: PhysicalAddress) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.frame_ptr(frame), FRAME_BYTES) }
    }
}

unsafe impl FrameMemory for HeapFrameMemory {
    #[allow(clippy::cast_possible_truncation)]
    fn frame_ptr(&self, frame: PhysicalAddress) -> *mut u8 {
        assert!(
            self.contains(frame),
            "{frame} is not backed by heap frame memory [{}, {})",
            self.base,
            self.limit()
        );
        let offset = (frame.as_u64() - self.base.as_u64()) as usize;
        // SAFETY: offset is inside the buffer (checked above).
        unsafe { self.buf.as_ptr().add(offset) }
    }
}

impl Drop for HeapFrameMemory {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout.
        unsafe { dealloc(self.buf.as_ptr(), Self::layout(self.frames)) }
    }
}
