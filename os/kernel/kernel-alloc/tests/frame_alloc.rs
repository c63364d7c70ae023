use kernel_alloc::{
    FRAME_SIZE, FillPatterns, FrameAlloc, FrameAllocator, FrameConfig, FrameMemory, FrameStats,
    HeapFrameMemory, PhysicalAddress,
};
use kernel_info::memory::{ALLOC_FILL, FREE_FILL};

const BASE: u64 = 0x8000_0000;
const TABLE: usize = 16;

type TestFrames = FrameAllocator<HeapFrameMemory, TABLE>;

fn pa(frame: u64) -> PhysicalAddress {
    PhysicalAddress::new(BASE + frame * FRAME_SIZE)
}

fn uninitialized() -> TestFrames {
    let base = pa(0);
    FrameAllocator::new(
        FrameConfig::with_base(base),
        HeapFrameMemory::new(base, TABLE),
    )
}

/// `reserved` frames of kernel image followed by `usable` pooled frames.
fn frames(reserved: u64, usable: u64) -> TestFrames {
    let frames = uninitialized();
    unsafe { frames.initialize(pa(reserved), pa(reserved + usable)) };
    frames
}

fn drain(frames: &TestFrames) -> Vec<PhysicalAddress> {
    std::iter::from_fn(|| frames.allocate()).collect()
}

fn frame_is(frames: &TestFrames, frame: PhysicalAddress, byte: u8) -> bool {
    unsafe { frames.memory().frame(frame) }.iter().all(|&b| b == byte)
}

fn scribble(frames: &TestFrames, frame: PhysicalAddress, byte: u8) {
    unsafe { std::ptr::write_bytes(frames.memory().frame_ptr(frame), byte, FRAME_SIZE as usize) };
}

#[test]
fn initialize_pools_every_usable_frame() {
    let frames = frames(2, 6);
    assert!(frames.is_initialized());
    assert_eq!(
        frames.stats(),
        FrameStats {
            total: 6,
            free: 6,
            owned: 0,
        }
    );

    for i in 0..8 {
        assert_eq!(frames.ref_count(pa(i)), 0);
    }
    for i in 2..8 {
        assert!(frame_is(&frames, pa(i), FREE_FILL));
    }
    // the kernel image is left alone
    assert!(frame_is(&frames, pa(0), 0));
    assert!(frame_is(&frames, pa(1), 0));
}

#[test]
fn range_reflects_initialize_arguments() {
    let frames = uninitialized();
    assert!(frames.range().is_none());
    unsafe { frames.initialize(pa(3) + 0x10, pa(10) + 0x10) };

    let range = frames.range().unwrap();
    assert_eq!(range.base(), pa(0));
    assert_eq!(range.reserved_end(), pa(4));
    assert_eq!(range.limit(), pa(10));
    assert_eq!(frames.stats().total, 6);
}

#[test]
fn first_allocation_is_the_last_frame_pooled() {
    let frames = frames(1, 4);
    assert_eq!(frames.allocate(), Some(pa(4)));
    assert_eq!(frames.allocate(), Some(pa(3)));
}

#[test]
fn fresh_frame_has_one_owner_and_one_release_pools_it() {
    let frames = frames(1, 4);
    let frame = frames.allocate().unwrap();
    assert_eq!(frames.ref_count(frame), 1);
    assert_eq!(frames.stats().owned, 1);

    frames.release(frame);
    assert_eq!(frames.ref_count(frame), 0);
    assert_eq!(frames.stats().free, 4);
}

#[test]
fn k_retains_need_k_plus_one_releases() {
    let frames = frames(1, 4);
    for k in 0..5 {
        let frame = frames.allocate().unwrap();
        for _ in 0..k {
            frames.retain(frame);
        }
        assert_eq!(frames.ref_count(frame), k + 1);

        for remaining in (1..=k).rev() {
            frames.release(frame);
            assert_eq!(frames.ref_count(frame), remaining);
            assert_eq!(frames.stats().free, 3, "pooled with {remaining} owners left");
        }
        frames.release(frame);
        assert_eq!(frames.stats().free, 4);
    }
}

#[test]
fn pool_is_lifo() {
    let frames = frames(1, 4);
    let all = drain(&frames);
    assert_eq!(all.len(), 4);
    let (a, b) = (all[1], all[3]);

    frames.release(a);
    frames.release(b);
    assert_eq!(frames.allocate(), Some(b));
    assert_eq!(frames.allocate(), Some(a));
    assert_eq!(frames.allocate(), None);
}

#[test]
fn release_and_allocate_overwrite_contents() {
    let frames = frames(1, 2);
    let frame = frames.allocate().unwrap();
    assert!(frame_is(&frames, frame, ALLOC_FILL));

    scribble(&frames, frame, 0xAB);
    frames.release(frame);
    assert!(frame_is(&frames, frame, FREE_FILL));

    assert_eq!(frames.allocate(), Some(frame));
    assert!(frame_is(&frames, frame, ALLOC_FILL));
}

#[test]
fn shared_release_keeps_contents() {
    let frames = frames(1, 2);
    let frame = frames.allocate().unwrap();
    frames.retain(frame);
    scribble(&frames, frame, 0xCD);

    frames.release(frame);
    assert!(frame_is(&frames, frame, 0xCD));

    frames.release(frame);
    assert!(frame_is(&frames, frame, FREE_FILL));
}

#[test]
fn custom_fill_patterns_are_used() {
    let base = pa(0);
    let frames: TestFrames = FrameAllocator::new(
        FrameConfig::with_base(base).with_fill(FillPatterns::new(0xDD, 0xAA)),
        HeapFrameMemory::new(base, TABLE),
    );
    unsafe { frames.initialize(pa(1), pa(3)) };
    assert!(frame_is(&frames, pa(2), 0xDD));

    let frame = frames.allocate().unwrap();
    assert!(frame_is(&frames, frame, 0xAA));
}

#[test]
fn single_frame_exhaustion_and_recovery() {
    let frames = frames(1, 1);
    let frame = frames.allocate().unwrap();
    assert_eq!(frames.allocate(), None);
    assert_eq!(frames.stats().free, 0);

    frames.release(frame);
    assert_eq!(frames.allocate(), Some(frame));
}

#[test]
fn empty_usable_range_allocates_nothing() {
    let frames = frames(4, 0);
    assert_eq!(frames.stats().total, 0);
    assert_eq!(frames.allocate(), None);
}

#[test]
fn conservation_over_mixed_operations() {
    let frames = frames(3, 13);
    let total = frames.stats().total;
    let mut owned: Vec<PhysicalAddress> = Vec::new();

    // xorshift, fixed seed
    let mut state = 0x2545_F491_4F6C_DD1D_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..2_000 {
        let roll = next();
        #[allow(clippy::cast_possible_truncation)]
        let pick = (roll >> 8) as usize;
        match roll % 4 {
            0 | 1 => {
                if let Some(frame) = frames.allocate() {
                    owned.push(frame);
                } else {
                    assert_eq!(frames.stats().free, 0);
                }
            }
            2 if !owned.is_empty() => {
                let frame = owned[pick % owned.len()];
                frames.retain(frame);
                owned.push(frame);
            }
            _ if !owned.is_empty() => {
                let frame = owned.swap_remove(pick % owned.len());
                frames.release(frame);
            }
            _ => {}
        }

        let stats = frames.stats();
        assert_eq!(stats.free + stats.owned, total);
        let mut distinct = owned.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(stats.owned, distinct.len());
        for frame in &distinct {
            let refs = owned.iter().filter(|f| *f == frame).count();
            assert_eq!(frames.ref_count(*frame) as usize, refs);
        }
    }

    for frame in owned.drain(..) {
        frames.release(frame);
    }
    assert_eq!(frames.stats().free, total);
}

/// What the virtual-memory side does on fork and on copy-on-write.
fn fork_then_copy_on_write<A: FrameAlloc>(alloc: &A, parent: PhysicalAddress) -> PhysicalAddress {
    alloc.retain_4k(parent);
    let copy = alloc.alloc_4k().unwrap();
    alloc.free_4k(parent);
    copy
}

#[test]
fn frame_alloc_trait_supports_copy_on_write() {
    let frames = frames(1, 4);
    let parent = frames.alloc_4k().unwrap();
    let child = fork_then_copy_on_write(&frames, parent);

    assert_ne!(parent, child);
    assert_eq!(frames.ref_count(parent), 1);
    assert_eq!(frames.ref_count(child), 1);

    frames.free_4k(parent);
    frames.free_4k(child);
    assert_eq!(frames.stats().free, 4);
}

#[test]
fn reserved_frames_can_be_indexed() {
    let frames = frames(2, 2);
    assert_eq!(frames.index_of(pa(0)), 0);
    assert_eq!(frames.index_of(pa(3)), 3);
}

#[test]
#[should_panic(expected = "not frame-aligned")]
fn release_misaligned_is_fatal() {
    let frames = frames(1, 4);
    let frame = frames.allocate().unwrap();
    frames.release(frame + 0x80);
}

#[test]
#[should_panic(expected = "reserved kernel memory")]
fn release_reserved_is_fatal() {
    let frames = frames(2, 4);
    frames.release(pa(1));
}

#[test]
#[should_panic(expected = "outside the managed range")]
fn release_at_limit_is_fatal() {
    let frames = frames(1, 4);
    frames.release(pa(5));
}

#[test]
#[should_panic(expected = "outside the managed range")]
fn release_below_base_is_fatal() {
    let frames = frames(1, 4);
    frames.release(PhysicalAddress::new(BASE - FRAME_SIZE));
}

#[test]
#[should_panic(expected = "null frame address")]
fn release_null_is_fatal() {
    let frames = frames(1, 4);
    frames.release(PhysicalAddress::zero());
}

#[test]
#[should_panic(expected = "released more often than it was retained")]
fn double_release_is_fatal() {
    let frames = frames(1, 4);
    let frame = frames.allocate().unwrap();
    frames.release(frame);
    frames.release(frame);
}

#[test]
#[should_panic(expected = "not frame-aligned")]
fn retain_misaligned_is_fatal() {
    let frames = frames(1, 4);
    let frame = frames.allocate().unwrap();
    frames.retain(frame + 1);
}

#[test]
#[should_panic(expected = "reserved kernel memory")]
fn retain_reserved_is_fatal() {
    let frames = frames(2, 4);
    frames.retain(pa(0));
}

#[test]
#[should_panic(expected = "outside the managed range")]
fn retain_at_limit_is_fatal() {
    let frames = frames(1, 4);
    frames.retain(pa(5));
}

#[test]
#[should_panic(expected = "is not allocated")]
fn retain_free_frame_is_fatal() {
    let frames = frames(1, 4);
    frames.retain(pa(2));
}

#[test]
#[should_panic(expected = "outside the managed range")]
fn ref_count_outside_range_is_fatal() {
    let frames = frames(1, 4);
    let _ = frames.ref_count(pa(9));
}

#[test]
#[should_panic(expected = "used before initialization")]
fn allocate_before_initialize_is_fatal() {
    let frames = uninitialized();
    let _ = frames.allocate();
}

#[test]
#[should_panic(expected = "initialized twice")]
fn second_initialize_is_fatal() {
    let frames = frames(1, 4);
    unsafe { frames.initialize(pa(1), pa(5)) };
}

#[test]
#[should_panic(expected = "invalid managed range")]
fn initialize_beyond_table_capacity_is_fatal() {
    let frames = uninitialized();
    unsafe { frames.initialize(pa(1), pa(TABLE as u64 + 1)) };
}

#[test]
#[should_panic(expected = "invalid managed range")]
fn initialize_with_inverted_bounds_is_fatal() {
    let frames = uninitialized();
    unsafe { frames.initialize(pa(6), pa(2)) };
}

fn zero_based() -> FrameAllocator<HeapFrameMemory, 4> {
    let zero = PhysicalAddress::zero();
    FrameAllocator::new(FrameConfig::with_base(zero), HeapFrameMemory::new(zero, 4))
}

#[test]
fn zero_based_range_skips_frame_zero() {
    let frames = zero_based();
    unsafe {
        frames.initialize(
            PhysicalAddress::new(FRAME_SIZE),
            PhysicalAddress::new(4 * FRAME_SIZE),
        );
    };
    assert_eq!(frames.stats().total, 3);
    let all: Vec<_> = std::iter::from_fn(|| frames.allocate()).collect();
    assert!(!all.iter().any(|frame| frame.is_null()));
}

#[test]
#[should_panic(expected = "invalid managed range")]
fn usable_frame_zero_is_fatal() {
    let frames = zero_based();
    unsafe { frames.initialize(PhysicalAddress::zero(), PhysicalAddress::new(4 * FRAME_SIZE)) };
}
