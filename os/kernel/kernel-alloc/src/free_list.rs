/// LIFO stack of free frame indices.
///
/// Links live in a side array (`next[i]` is the frame below `i` on the
/// stack) instead of inside the free frames, so freed memory is never read
/// back as a pointer.
///
/// ```text
///  head ─► 7 ─► 3 ─► 4 ─► ∅
///  next: [_, _, _, 4, ∅, _, _, 3]
/// ```
///
/// # Invariants
/// - Every index on the stack is `< N` and appears at most once.
/// - `len` equals the number of indices reachable from `head`.
/// - Only touched while holding the pool lock.
pub struct FreeStack<const N: usize> {
    head: Option<u32>,
    len: usize,
    next: [Option<u32>; N],
}

impl<const N: usize> FreeStack<N> {
    pub const fn new() -> Self {
        Self {
            head: None,
            len: 0,
            next: [None; N],
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, index: usize) {
        debug_assert!(index < N);
        self.next[index] = self.head;
        // Fits: the allocator rejects tables with `N >= u32::MAX`.
        self.head = Some(index as u32);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<usize> {
        let index = self.head? as usize;
        self.head = self.next[index].take();
        self.len -= 1;
        Some(index)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }
}
