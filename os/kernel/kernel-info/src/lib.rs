//! # Kernel Memory Configuration
//!
//! Compile-time constants describing the physical memory the kernel manages
//! and how the frame allocator treats it. This crate is the single source of
//! truth for those values; the allocator, the kernel binary and the host-side
//! tests all read them from here.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! Physical Memory Layout:
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//!             │  (BIOS, VGA, DMA buffers)       │
//! PHYS_BASE   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//!             │   (reserved, never freed)       │
//! kernel end  ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             │  (Managed by frame allocator)   │
//! PHYS_TOP    └─────────────────────────────────┘
//! ```
//!
//! The end of the kernel image is only known at link time and is handed to
//! the allocator at boot; everything else is fixed here.
//!
//! ## Fill Patterns
//!
//! Frames are overwritten with [`memory::FREE_FILL`] when they are released
//! and with [`memory::ALLOC_FILL`] when they are handed out. The two differ so
//! that a dump of a frame tells which side of the lifecycle touched it last.
//!
//! ```rust
//! use kernel_info::memory::{FRAME_SIZE, MANAGED_FRAMES, PHYS_BASE, PHYS_TOP};
//!
//! assert_eq!((PHYS_TOP - PHYS_BASE) / FRAME_SIZE, MANAGED_FRAMES as u64);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
