//! The kernel's frame allocator instance.
//!
//! Covers `[PHYS_BASE, PHYS_TOP)` through the HHDM. Boot code calls
//! [`init_frames`] once with the end of the kernel image; everything else
//! borrows the instance through [`frames`].

use crate::PhysicalAddress;
use crate::config::FrameConfig;
use crate::frame_alloc::FrameAllocator;
use crate::phys_mapper::HhdmFrameMemory;
use kernel_info::memory::{MANAGED_FRAMES, PHYS_TOP};

pub type KernelFrameAllocator = FrameAllocator<HhdmFrameMemory, MANAGED_FRAMES>;

static FRAMES: KernelFrameAllocator = FrameAllocator::new(FrameConfig::kernel(), HhdmFrameMemory);

#[inline]
#[must_use]
pub fn frames() -> &'static KernelFrameAllocator {
    &FRAMES
}

/// Pool all physical memory between the kernel image and `PHYS_TOP`.
///
/// # Safety
/// The HHDM must already map `[PHYS_BASE, PHYS_TOP)` writable, and nothing
/// but the kernel image may live in that range.
pub unsafe fn init_frames(kernel_end: PhysicalAddress) {
    unsafe { FRAMES.initialize(kernel_end, PhysicalAddress::new(PHYS_TOP)) }
}
