//! Boundary validation for frame addresses.

use crate::address::{FRAME_SIZE, PhysicalAddress};
use crate::error::FrameError;
use core::ops::Range;

/// The physical interval an allocator instance is responsible for.
///
/// ```text
/// base           reserved_end                         limit
///  ├──────────────────┼─────────────────────────────────┤
///  │ kernel image     │ usable frames (pooled at init)  │
/// ```
///
/// Every frame in `[base, limit)` has a slot in the reference-count table.
/// Only frames in `[reserved_end, limit)` may ever be owned or freed.
///
/// # Invariants
/// - `base`, `reserved_end` and `limit` are frame-aligned.
/// - `base <= reserved_end <= limit`.
/// - Fixed once built; an allocator stores exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ManagedRange {
    base: PhysicalAddress,
    reserved_end: PhysicalAddress,
    limit: PhysicalAddress,
}

impl ManagedRange {
    /// Build the range for a table of `capacity` frames starting at `base`.
    ///
    /// `reserved_end` is rounded up and `limit` rounded down to frame
    /// boundaries, so a partially covered frame at either end is never handed
    /// out.
    ///
    /// # Errors
    /// [`FrameError::InvalidRange`] if `base` is misaligned, the bounds are out
    /// of order, frame 0 would be usable, or `[base, limit)` holds more
    /// frames than `capacity`.
    pub fn new(
        base: PhysicalAddress,
        reserved_end: PhysicalAddress,
        limit: PhysicalAddress,
        capacity: usize,
    ) -> Result<Self, FrameError> {
        let invalid = FrameError::InvalidRange {
            base,
            reserved_end,
            limit,
            capacity,
        };

        let Some(first_free) = reserved_end.checked_align_up() else {
            return Err(invalid);
        };
        let end = limit.align_down();

        if !base.is_frame_aligned() || first_free < base || end < first_free {
            return Err(invalid);
        }
        // Frame 0 doubles as the null address and can never be owned.
        if first_free.is_null() && end > first_free {
            return Err(invalid);
        }
        let frames = (end.as_u64() - base.as_u64()) / FRAME_SIZE;
        if !usize::try_from(frames).is_ok_and(|frames| frames <= capacity) {
            return Err(invalid);
        }

        Ok(Self {
            base,
            reserved_end: first_free,
            limit: end,
        })
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// First frame that may be owned or freed.
    #[inline]
    #[must_use]
    pub const fn reserved_end(&self) -> PhysicalAddress {
        self.reserved_end
    }

    #[inline]
    #[must_use]
    pub const fn limit(&self) -> PhysicalAddress {
        self.limit
    }

    /// Number of frames in `[reserved_end, limit)`.
    #[inline]
    #[must_use]
    pub fn usable_frames(&self) -> usize {
        self.usable_indices().len()
    }

    /// Table indices of the usable frames.
    #[inline]
    #[must_use]
    pub fn usable_indices(&self) -> Range<usize> {
        self.index_unchecked(self.reserved_end)..self.index_unchecked(self.limit)
    }

    /// Usable frame addresses in ascending order.
    pub fn usable(&self) -> impl Iterator<Item = PhysicalAddress> + use<> {
        let base = self.base;
        self.usable_indices().map(move |i| base + i as u64 * FRAME_SIZE)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        self.base <= addr && addr < self.limit
    }

    /// Validate `addr` as a frame of this range and return its table index.
    ///
    /// # Errors
    /// [`FrameError::Misaligned`] or [`FrameError::OutOfRange`].
    pub fn check(&self, addr: PhysicalAddress) -> Result<usize, FrameError> {
        if !addr.is_frame_aligned() {
            return Err(FrameError::Misaligned(addr));
        }
        if !self.contains(addr) {
            return Err(FrameError::OutOfRange {
                addr,
                base: self.base,
                limit: self.limit,
            });
        }
        Ok(self.index_unchecked(addr))
    }

    /// Like [`check`](Self::check), but also rejects the null address and
    /// frames of the reserved kernel image.
    ///
    /// # Errors
    /// [`FrameError::Null`], [`FrameError::Reserved`], or anything
    /// [`check`](Self::check) reports.
    pub fn check_owned(&self, addr: PhysicalAddress) -> Result<usize, FrameError> {
        if addr.is_null() {
            return Err(FrameError::Null);
        }
        let index = self.check(addr)?;
        if addr < self.reserved_end {
            return Err(FrameError::Reserved {
                addr,
                reserved_end: self.reserved_end,
            });
        }
        Ok(index)
    }

    /// Frame address of a table index.
    #[inline]
    #[must_use]
    pub const fn address_of(&self, index: usize) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64() + index as u64 * FRAME_SIZE)
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index_unchecked(&self, addr: PhysicalAddress) -> usize {
        // Fits: the frame count was bounded by the table capacity in `new`.
        ((addr.as_u64() - self.base.as_u64()) / FRAME_SIZE) as usize
    }
}
