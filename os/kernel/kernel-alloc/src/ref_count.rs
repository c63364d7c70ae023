//! Per-frame owner counts.
//!
//! Counters are atomic, so `retain` and `release_one` on the same frame may
//! race between CPUs without a lock. Exactly one caller observes the
//! transition to zero.

use core::ops::Range;
use core::sync::atomic::{AtomicU32, Ordering};

/// Outcome of dropping one owner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Release {
    /// Other owners remain.
    Shared(u32),
    /// That was the last owner; the frame must be reclaimed.
    Last,
}

/// One counter per frame of the managed range, indexed by frame number.
///
/// Indices are validated by the caller against the managed range, whose size
/// never exceeds `N`.
pub struct RefCountTable<const N: usize> {
    counts: [AtomicU32; N],
}

impl<const N: usize> Default for RefCountTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RefCountTable<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [const { AtomicU32::new(0) }; N],
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> u32 {
        self.counts[index].load(Ordering::Acquire)
    }

    /// Add an owner to a frame that already has one.
    ///
    /// Returns the new count, or `None` if the frame has no owner (it is free)
    /// or the counter would overflow. The count is left unchanged then.
    pub fn retain(&self, index: usize) -> Option<u32> {
        self.counts[index]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                if c == 0 { None } else { c.checked_add(1) }
            })
            .ok()
            .map(|prev| prev + 1)
    }

    /// Give a free frame its first owner.
    ///
    /// # Errors
    /// The current count if it was not zero; the count is left unchanged.
    pub fn claim(&self, index: usize) -> Result<(), u32> {
        self.counts[index]
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Drop one owner.
    ///
    /// Returns `None` if the count already was zero; the count is left
    /// unchanged then.
    pub fn release_one(&self, index: usize) -> Option<Release> {
        // AcqRel: whoever reaches zero sees every write the other owners made.
        self.counts[index]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .ok()
            .map(|prev| match prev - 1 {
                0 => Release::Last,
                n => Release::Shared(n),
            })
    }

    /// Set every counter in `indices` to `value`.
    ///
    /// Only for initialization, before any frame in `indices` is shared.
    pub fn seed_range(&self, indices: Range<usize>, value: u32) {
        for count in &self.counts[indices] {
            count.store(value, Ordering::Release);
        }
    }
}
