//! Invariant violations and the fatal path.
//!
//! Frame addresses only ever come from the allocator itself or from trusted
//! kernel arithmetic, so a bad one means kernel state is already corrupt.
//! None of these errors is handed back to the callers of the public API;
//! they end in [`fatal`].

use crate::PhysicalAddress;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("{0} is not frame-aligned")]
    Misaligned(PhysicalAddress),
    #[error("{addr} is outside the managed range [{base}, {limit})")]
    OutOfRange {
        addr: PhysicalAddress,
        base: PhysicalAddress,
        limit: PhysicalAddress,
    },
    #[error("{addr} is reserved kernel memory (below {reserved_end})")]
    Reserved {
        addr: PhysicalAddress,
        reserved_end: PhysicalAddress,
    },
    #[error("null frame address")]
    Null,
    #[error("{0} released more often than it was retained")]
    DoubleRelease(PhysicalAddress),
    #[error("{0} is not allocated and cannot gain another owner")]
    NotAllocated(PhysicalAddress),
    #[error("reference count of {0} overflowed")]
    CountOverflow(PhysicalAddress),
    #[error("{addr} came out of the free pool with {count} owners")]
    PoolCorrupted { addr: PhysicalAddress, count: u32 },
    #[error("frame allocator used before initialization")]
    Uninitialized,
    #[error("frame allocator initialized twice")]
    AlreadyInitialized,
    #[error(
        "invalid managed range: base {base}, reserved end {reserved_end}, limit {limit}, capacity {capacity} frames"
    )]
    InvalidRange {
        base: PhysicalAddress,
        reserved_end: PhysicalAddress,
        limit: PhysicalAddress,
        capacity: usize,
    },
}

/// Halt on a broken allocator invariant.
///
/// Logs the violation and panics; the kernel's panic handler stops the
/// machine.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(err: FrameError) -> ! {
    log::error!("frame allocator: {err}");
    panic!("frame allocator: {err}");
}

/// Turns an invariant check into the fatal path.
pub trait OrFatal<T> {
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for Result<T, FrameError> {
    #[inline]
    #[track_caller]
    fn or_fatal(self) -> T {
        match self {
            Ok(v) => v,
            Err(err) => fatal(err),
        }
    }
}
