//! Reference-counted physical frame allocator.
//!
//! Frames move between two steady states:
//!
//! ```text
//!              initialize            allocate
//!  Owned(1) ───────────────► Free ───────────► Owned(1)
//!                             ▲                  │ retain
//!                             │  release (k = 1) ▼
//!                             └────────────── Owned(k)
//! ```
//!
//! Frames below the reserved end (the kernel image) stay `Reserved` forever.
//! A frame sits in the free pool iff its count is zero.

use crate::address::{FRAME_BYTES, PhysicalAddress};
use crate::config::{FillPatterns, FrameConfig};
use crate::error::{FrameError, OrFatal, fatal};
use crate::free_list::FreeStack;
use crate::phys_mapper::FrameMemory;
use crate::range::ManagedRange;
use crate::ref_count::{RefCountTable, Release};
use kernel_sync::{SpinLock, SyncOnceCell};
use log::{debug, info, trace};

/// Interface the virtual-memory subsystem programs against.
///
/// Implementations are internally synchronized, hence `&self`.
pub trait FrameAlloc {
    /// Allocate one 4 KiB frame with a single owner. `None` when exhausted.
    fn alloc_4k(&self) -> Option<PhysicalAddress>;

    /// Drop one owner of `frame`; the last owner returns it to the pool.
    fn free_4k(&self, frame: PhysicalAddress);

    /// Add an owner to an allocated `frame`, e.g. a second mapping after fork.
    fn retain_4k(&self, frame: PhysicalAddress);
}

/// Snapshot of pool occupancy over the usable range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames in `[reserved_end, limit)`.
    pub total: usize,
    /// Frames currently in the free pool.
    pub free: usize,
    /// Frames with at least one owner.
    pub owned: usize,
}

/// Physical frame allocator with per-frame owner counts.
///
/// `FRAMES` is the capacity of the reference-count table; the managed range
/// handed to [`initialize`](Self::initialize) must fit in it. The instance is
/// built by a `const fn` so the kernel can keep one in a `static` and fill in
/// the range at boot.
///
/// # Concurrency
/// The free stack sits behind a [`SpinLock`] held only for a push or pop.
/// Fill-pattern writes happen outside the lock, and owner counts are atomic.
pub struct FrameAllocator<M, const FRAMES: usize> {
    base: PhysicalAddress,
    fill: FillPatterns,
    range: SyncOnceCell<ManagedRange>,
    refs: RefCountTable<FRAMES>,
    free: SpinLock<FreeStack<FRAMES>>,
    memory: M,
}

impl<M, const FRAMES: usize> FrameAllocator<M, FRAMES> {
    #[must_use]
    pub const fn new(config: FrameConfig, memory: M) -> Self {
        const {
            assert!(FRAMES > 0, "frame table needs at least one slot");
            assert!(FRAMES < u32::MAX as usize, "frame indices must fit in u32");
        }
        Self {
            base: config.base,
            fill: config.fill,
            range: SyncOnceCell::new(),
            refs: RefCountTable::new(),
            free: SpinLock::new(FreeStack::new()),
            memory,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.range.is_ready()
    }

    /// The managed range, once [`initialize`](Self::initialize) ran.
    #[inline]
    #[must_use]
    pub fn range(&self) -> Option<&ManagedRange> {
        self.range.get()
    }

    #[inline]
    #[must_use]
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    #[inline]
    #[must_use]
    pub const fn fill_patterns(&self) -> FillPatterns {
        self.fill
    }

    #[inline]
    #[track_caller]
    fn managed(&self) -> &ManagedRange {
        self.range
            .get()
            .unwrap_or_else(|| fatal(FrameError::Uninitialized))
    }
}

impl<M: FrameMemory, const FRAMES: usize> FrameAllocator<M, FRAMES> {
    /// Pool every frame in `[reserved_end, limit)`.
    ///
    /// Each usable frame is first given one owner, then released, which
    /// fills it with the release pattern and pushes it onto the free stack.
    /// Frames are pushed in ascending order, so the first allocation returns
    /// the highest frame.
    ///
    /// # Safety
    /// The frames in `[reserved_end, limit)` must be unused RAM, reachable
    /// through this allocator's [`FrameMemory`], and must not be touched by
    /// anything else from now on except through frames this allocator hands
    /// out.
    ///
    /// # Panics
    /// Fatal if called twice, or if the range is malformed or does not fit
    /// the table.
    #[track_caller]
    pub unsafe fn initialize(&self, reserved_end: PhysicalAddress, limit: PhysicalAddress) {
        let range = ManagedRange::new(self.base, reserved_end, limit, FRAMES).or_fatal();
        let range = self
            .range
            .set(range)
            .map_err(|_| FrameError::AlreadyInitialized)
            .or_fatal();

        self.refs.seed_range(range.usable_indices(), 1);
        for frame in range.usable() {
            self.release(frame);
        }

        info!(
            "frame allocator: managing [{}, {}), {} usable frames above {}",
            range.base(),
            range.limit(),
            range.usable_frames(),
            range.reserved_end()
        );
    }

    /// Take the most recently released frame.
    ///
    /// The frame comes back filled with the allocation pattern and with one
    /// owner, the caller. `None` if the pool is empty; that is the only
    /// recoverable failure of the allocator.
    ///
    /// # Panics
    /// Fatal if the allocator is not initialized or the popped frame still has
    /// owners.
    #[must_use]
    pub fn allocate(&self) -> Option<PhysicalAddress> {
        let range = self.managed();
        let Some(index) = self.free.with_lock(FreeStack::pop) else {
            debug!("frame allocator: out of physical frames");
            return None;
        };

        let frame = range.address_of(index);
        self.overwrite(frame, self.fill.on_allocate());
        if let Err(count) = self.refs.claim(index) {
            fatal(FrameError::PoolCorrupted { addr: frame, count });
        }

        trace!("frame allocator: allocated {frame}");
        Some(frame)
    }

    /// Drop one owner of `frame`.
    ///
    /// While other owners remain only the count changes. The last release
    /// overwrites the frame with the release pattern and pushes it onto the
    /// free stack.
    ///
    /// # Panics
    /// Fatal if `frame` is null, misaligned, outside the managed range, part
    /// of the reserved kernel image, or has no owner left.
    #[track_caller]
    pub fn release(&self, frame: PhysicalAddress) {
        let index = self.managed().check_owned(frame).or_fatal();
        match self.refs.release_one(index) {
            None => fatal(FrameError::DoubleRelease(frame)),
            Some(Release::Shared(owners)) => {
                trace!("frame allocator: {frame} still has {owners} owners");
            }
            Some(Release::Last) => self.reclaim(index, frame),
        }
    }

    /// Add an owner to an allocated `frame`.
    ///
    /// # Panics
    /// Fatal on the same addresses as [`release`](Self::release), if the frame
    /// is free, or if its count would overflow.
    #[track_caller]
    pub fn retain(&self, frame: PhysicalAddress) {
        let index = self.managed().check_owned(frame).or_fatal();
        let Some(owners) = self.refs.retain(index) else {
            let count = self.refs.get(index);
            fatal(if count == 0 {
                FrameError::NotAllocated(frame)
            } else {
                FrameError::CountOverflow(frame)
            });
        };
        trace!("frame allocator: {frame} now has {owners} owners");
    }

    /// Table index of any frame in `[base, limit)`, reserved frames included.
    ///
    /// # Panics
    /// Fatal if `frame` is misaligned or outside the managed range.
    #[must_use]
    #[track_caller]
    pub fn index_of(&self, frame: PhysicalAddress) -> usize {
        self.managed().check(frame).or_fatal()
    }

    /// Current number of owners of `frame`. Reserved frames report zero.
    ///
    /// # Panics
    /// Fatal if `frame` is misaligned or outside the managed range.
    #[must_use]
    #[track_caller]
    pub fn ref_count(&self, frame: PhysicalAddress) -> u32 {
        self.refs.get(self.index_of(frame))
    }

    /// # Panics
    /// Fatal if the allocator is not initialized.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        let total = self.managed().usable_frames();
        let free = self.free.with_lock(|stack| stack.len());
        FrameStats {
            total,
            free,
            owned: total - free,
        }
    }

    fn reclaim(&self, index: usize, frame: PhysicalAddress) {
        self.overwrite(frame, self.fill.on_release());
        self.free.with_lock(|stack| stack.push(index));
        trace!("frame allocator: released {frame}");
    }

    fn overwrite(&self, frame: PhysicalAddress, pattern: u8) {
        // SAFETY: the frame has no owner and is not on the free stack, so
        // this thread is the only one that may touch it; `FrameMemory`
        // guarantees the pointer covers the whole frame.
        unsafe { core::ptr::write_bytes(self.memory.frame_ptr(frame), pattern, FRAME_BYTES) }
    }
}

impl<M: FrameMemory, const FRAMES: usize> FrameAlloc for FrameAllocator<M, FRAMES> {
    fn alloc_4k(&self) -> Option<PhysicalAddress> {
        self.allocate()
    }

    fn free_4k(&self, frame: PhysicalAddress) {
        self.release(frame);
    }

    fn retain_4k(&self, frame: PhysicalAddress) {
        self.retain(frame);
    }
}
