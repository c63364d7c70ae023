use core::fmt;
use core::ops::{Add, AddAssign};
use kernel_info::memory;

/// Size of a physical frame in bytes.
pub const FRAME_SIZE: u64 = memory::FRAME_SIZE;

#[allow(clippy::cast_possible_truncation)]
pub const FRAME_BYTES: usize = FRAME_SIZE as usize;

/// Physical memory address.
///
/// A thin wrapper around `u64` that carries "this is physical" intent through
/// the allocator API. Frame addresses are physical addresses whose low
/// [`FRAME_SHIFT`](memory::FRAME_SHIFT) bits are zero.
///
/// ```rust
/// # use kernel_alloc::PhysicalAddress;
/// let pa = PhysicalAddress::new(0x0010_2042);
/// assert!(!pa.is_frame_aligned());
/// assert_eq!(pa.align_down().as_u64(), 0x0010_2000);
/// assert_eq!(pa.checked_align_up().map(PhysicalAddress::as_u64), Some(0x0010_3000));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_frame_aligned(self) -> bool {
        self.0 & (FRAME_SIZE - 1) == 0
    }

    /// Start of the frame containing this address.
    #[inline]
    #[must_use]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !(FRAME_SIZE - 1))
    }

    /// Start of the first frame at or above this address, `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_align_up(self) -> Option<Self> {
        match self.0.checked_add(FRAME_SIZE - 1) {
            Some(v) => Some(Self(v & !(FRAME_SIZE - 1))),
            None => None,
        }
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        pa.as_u64()
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
