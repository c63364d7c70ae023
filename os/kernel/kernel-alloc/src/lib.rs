//! # Physical Frame Allocation
//!
//! Hands out and reclaims 4 KiB physical frames and tracks, per frame, how
//! many mappings own it. A frame only goes back to the free pool when its last
//! owner lets go, which is what lets two address spaces share a frame until
//! one of them copies on write.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          Allocation API (FrameAllocator)            │
//! │    • allocate / release / retain / initialize       │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │   Free pool (free_list)  │  Reference counts        │
//! │   • LIFO index stack     │  (ref_count)             │
//! │   • SpinLock guarded     │  • one AtomicU32/frame   │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Boundary validator (range)                │
//! │    • frame alignment, [base, limit), reserved end   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Model
//!
//! Running out of frames is normal: [`FrameAllocator::allocate`] returns
//! `None`. Everything else (misaligned or foreign addresses, freeing the
//! kernel image, releasing a frame nobody owns) is a kernel bug and halts via
//! [`error::fatal`].
//!
//! ## Usage
//!
//! ```rust
//! use kernel_alloc::{FrameAllocator, FrameConfig, HeapFrameMemory, PhysicalAddress, FRAME_SIZE};
//!
//! let base = PhysicalAddress::new(0x8000_0000);
//! let frames: FrameAllocator<_, 8> =
//!     FrameAllocator::new(FrameConfig::with_base(base), HeapFrameMemory::new(base, 8));
//!
//! // The first frame holds the "kernel image".
//! unsafe { frames.initialize(base + FRAME_SIZE, base + 8 * FRAME_SIZE) };
//!
//! let frame = frames.allocate().expect("pool is not empty");
//! frames.retain(frame); // shared by a second mapping
//! frames.release(frame);
//! assert_eq!(frames.ref_count(frame), 1);
//! frames.release(frame);
//! assert_eq!(frames.stats().free, 7);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod address;
pub mod config;
pub mod error;
pub mod frame_alloc;
mod free_list;
pub mod global;
pub mod phys_mapper;
pub mod range;
pub mod ref_count;

pub use address::{FRAME_SIZE, PhysicalAddress};
pub use config::{FillPatterns, FrameConfig};
pub use error::FrameError;
pub use frame_alloc::{FrameAlloc, FrameAllocator, FrameStats};
pub use global::{KernelFrameAllocator, frames, init_frames};
pub use phys_mapper::{FrameMemory, HeapFrameMemory, HhdmFrameMemory};
pub use range::ManagedRange;
