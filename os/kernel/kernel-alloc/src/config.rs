//! Per-instance allocator configuration.

use crate::PhysicalAddress;
use kernel_info::memory::{ALLOC_FILL, FREE_FILL, PHYS_BASE};

/// Bytes written over a frame on its way into and out of the free pool.
///
/// The two patterns must differ; a frame dump then shows whether it was last
/// released or last handed out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FillPatterns {
    on_release: u8,
    on_allocate: u8,
}

impl FillPatterns {
    /// Patterns from the kernel memory configuration.
    pub const KERNEL: Self = Self::new(FREE_FILL, ALLOC_FILL);

    /// # Panics
    /// If both patterns are equal. In a `const` context this is a build error.
    #[must_use]
    pub const fn new(on_release: u8, on_allocate: u8) -> Self {
        assert!(
            on_release != on_allocate,
            "release and allocation fill patterns must differ"
        );
        Self {
            on_release,
            on_allocate,
        }
    }

    #[inline]
    #[must_use]
    pub const fn on_release(self) -> u8 {
        self.on_release
    }

    #[inline]
    #[must_use]
    pub const fn on_allocate(self) -> u8 {
        self.on_allocate
    }
}

impl Default for FillPatterns {
    fn default() -> Self {
        Self::KERNEL
    }
}

/// What an allocator instance needs before boot hands it a memory range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Physical address of table slot 0.
    pub base: PhysicalAddress,
    pub fill: FillPatterns,
}

impl FrameConfig {
    /// The kernel's own configuration.
    #[must_use]
    pub const fn kernel() -> Self {
        Self::with_base(PhysicalAddress::new(PHYS_BASE))
    }

    /// Kernel fill patterns with a different base, e.g. for a hosted arena.
    #[must_use]
    pub const fn with_base(base: PhysicalAddress) -> Self {
        Self {
            base,
            fill: FillPatterns::KERNEL,
        }
    }

    #[must_use]
    pub const fn with_fill(self, fill: FillPatterns) -> Self {
        Self { fill, ..self }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::kernel()
    }
}
