//! # Physical Memory Layout

/// Size of a physical frame, in bytes.
pub const FRAME_SIZE: u64 = 4096;

/// log2([`FRAME_SIZE`]).
pub const FRAME_SHIFT: u32 = 12;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel image is placed in *physical* memory.
///
/// This is also the first byte of the range the frame allocator tracks;
/// everything between here and the end of the kernel image is reserved.
pub const PHYS_BASE: u64 = 0x0010_0000; // 1 MiB

/// Amount of physical memory tracked by the frame allocator.
pub const PHYS_MEMORY_SIZE: u64 = 128 * 1024 * 1024; // 128 MiB

/// First physical address past the tracked range.
pub const PHYS_TOP: u64 = PHYS_BASE + PHYS_MEMORY_SIZE;

/// Number of frames in `[PHYS_BASE, PHYS_TOP)`, i.e. the size of the
/// reference-count table.
#[allow(clippy::cast_possible_truncation)]
pub const MANAGED_FRAMES: usize = (PHYS_MEMORY_SIZE / FRAME_SIZE) as usize;

/// Byte written over a frame when it goes back to the free pool.
pub const FREE_FILL: u8 = 0x01;

/// Byte written over a frame when it is handed out.
///
/// Deliberately non-zero so code relying on zeroed allocations breaks early.
pub const ALLOC_FILL: u8 = 0x05;

const _: () = {
    assert!(FRAME_SIZE == 1 << FRAME_SHIFT);
    assert!(PHYS_BASE.is_multiple_of(FRAME_SIZE));
    assert!(PHYS_TOP.is_multiple_of(FRAME_SIZE));
    assert!(PHYS_TOP > PHYS_BASE);
    assert!(MANAGED_FRAMES < u32::MAX as usize);
    assert!(FREE_FILL != ALLOC_FILL);
};
