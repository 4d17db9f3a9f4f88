//! Bump allocator over a caller-owned buffer

use super::allocator::{align_up, Allocator, Block};

/// A linear (bump) allocator bound to an externally owned buffer.
///
/// Allocation advances a cursor through the buffer; individual deallocation
/// is not supported, only [`clear`](Arena::clear), which resets the whole
/// arena in O(1). The one refinement over a plain bump cursor is the
/// watermark: the arena remembers where the most recent allocation started,
/// so resizing *that* allocation moves the cursor instead of copying. Code
/// that grows a buffer by repeated appends — and nothing has allocated in
/// between — pays O(1) per grow instead of a copy.
///
/// The arena borrows its buffer for its whole lifetime and owns no memory
/// itself. This also means no aliasing allocator can touch the buffer while
/// the arena lives; the borrow checker enforces what the equivalent C code
/// documents.
///
/// Typical setups keep one long-lived arena for persistent data and one
/// cleared every frame for scratch.
///
/// # Example
///
/// ```rust
/// use ember_engine::memory::Arena;
///
/// let mut buf = [0u8; 256];
/// let mut arena = Arena::new(&mut buf);
///
/// let block = arena.alloc(64, 8).expect("fits");
/// arena.bytes_mut(block)[0] = 0xAB;
///
/// arena.clear(); // all blocks stale, full capacity available again
/// ```
pub struct Arena<'buf> {
    buf: &'buf mut [u8],
    offset: usize,
    prev_offset: usize,
}

impl<'buf> Arena<'buf> {
    /// Binds an arena to `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is empty.
    #[must_use]
    pub fn new(buf: &'buf mut [u8]) -> Self {
        assert!(!buf.is_empty(), "arena buffer must be non-empty");
        Self {
            buf,
            offset: 0,
            prev_offset: 0,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently consumed, including alignment padding.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.offset
    }

    /// Bytes still available past the cursor.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Allocates `size` bytes aligned to `align`, or `None` if they do not
    /// fit. A failed allocation leaves the arena untouched.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn alloc(&mut self, size: usize, align: usize) -> Option<Block> {
        assert!(align.is_power_of_two(), "alignment must be a power of two");
        let aligned = align_up(self.offset, align);
        let end = aligned.checked_add(size)?;
        if end > self.buf.len() {
            return None;
        }
        // The watermark records the cursor as it was before this call (the
        // start of any alignment padding), not the aligned start.
        self.prev_offset = self.offset;
        self.offset = end;
        Some(Block::new(aligned, size))
    }

    /// Resizes `block` to `new_size` bytes.
    ///
    /// If `block` is the most recent allocation, the resize happens in place
    /// by moving the cursor; otherwise a fresh block is allocated,
    /// `min(old, new)` bytes are copied over, and the old block's space is
    /// abandoned. Returns `None` without mutating anything when the arena
    /// cannot fit the resized block.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two, or if `block` lies outside
    /// the arena's buffer — a block from another allocator is a programmer
    /// error, not a recoverable condition.
    pub fn realloc(&mut self, block: Block, new_size: usize, align: usize) -> Option<Block> {
        assert!(align.is_power_of_two(), "alignment must be a power of two");
        assert!(
            block.end() <= self.buf.len(),
            "block out of bounds of the arena"
        );
        if block.is_empty() {
            return self.alloc(new_size, align);
        }
        if block.offset() == self.prev_offset {
            // Most recent allocation: resize in place by moving the cursor.
            let end = block.offset().checked_add(new_size)?;
            if end > self.buf.len() {
                return None;
            }
            self.offset = end;
            return Some(Block::new(block.offset(), new_size));
        }
        let fresh = self.alloc(new_size, align)?;
        let copy = block.len().min(new_size);
        self.buf
            .copy_within(block.offset()..block.offset() + copy, fresh.offset());
        Some(fresh)
    }

    /// Discards every allocation at once.
    ///
    /// O(1): only the cursor and watermark reset; buffer contents are left
    /// as they are. All outstanding blocks become stale.
    #[inline]
    pub fn clear(&mut self) {
        self.offset = 0;
        self.prev_offset = 0;
    }

    /// Resolves `block` to its bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self, block: Block) -> &[u8] {
        &self.buf[block.offset()..block.end()]
    }

    /// Resolves `block` to its bytes, mutably.
    #[inline]
    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        &mut self.buf[block.offset()..block.end()]
    }
}

impl Allocator for Arena<'_> {
    fn alloc(&mut self, size: usize, align: usize) -> Option<Block> {
        Arena::alloc(self, size, align)
    }

    fn realloc(&mut self, block: Block, new_size: usize, align: usize) -> Option<Block> {
        Arena::realloc(self, block, new_size, align)
    }

    fn free(&mut self, _block: Block) {
        // A bump arena cannot reclaim individual blocks.
    }

    fn clear(&mut self) {
        Arena::clear(self);
    }

    fn bytes(&self, block: Block) -> &[u8] {
        Arena::bytes(self, block)
    }

    fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        Arena::bytes_mut(self, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_respect_alignment() {
        let mut buf = [0u8; 256];
        let mut arena = Arena::new(&mut buf);
        arena.alloc(3, 1).unwrap();
        for align in [1usize, 2, 4, 8, 16, 32] {
            let block = arena.alloc(5, align).unwrap();
            assert_eq!(block.offset() % align, 0);
        }
    }

    #[test]
    fn exhaustion_fails_without_mutation() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let first = arena.alloc(8, 1).unwrap();
        let used = arena.used();

        assert!(arena.alloc(512, 1).is_none());
        assert_eq!(arena.used(), used);

        // The watermark survived the failed allocation too: the first block
        // still resizes in place.
        let grown = arena.realloc(first, 16, 1).unwrap();
        assert_eq!(grown.offset(), first.offset());
    }

    #[test]
    fn realloc_of_last_allocation_is_in_place() {
        let mut buf = [0u8; 256];
        let mut arena = Arena::new(&mut buf);
        let block = arena.alloc(8, 1).unwrap();
        let used = arena.used();

        let grown = arena.realloc(block, 32, 1).unwrap();
        assert_eq!(grown.offset(), block.offset());
        assert_eq!(grown.len(), 32);
        assert_eq!(arena.used(), used + 24);
    }

    #[test]
    fn realloc_of_older_allocation_copies() {
        let mut buf = [0u8; 256];
        let mut arena = Arena::new(&mut buf);
        let a = arena.alloc(8, 1).unwrap();
        arena.bytes_mut(a).copy_from_slice(b"abcdefgh");
        let _b = arena.alloc(8, 1).unwrap();

        let moved = arena.realloc(a, 32, 1).unwrap();
        assert_ne!(moved.offset(), a.offset());
        assert_eq!(&arena.bytes(moved)[..8], b"abcdefgh");
    }

    #[test]
    fn in_place_shrink_releases_space() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let block = arena.alloc(48, 1).unwrap();
        let shrunk = arena.realloc(block, 16, 1).unwrap();
        assert_eq!(shrunk.offset(), block.offset());
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn in_place_grow_past_capacity_fails_cleanly() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let block = arena.alloc(32, 1).unwrap();

        assert!(arena.realloc(block, 128, 1).is_none());
        assert_eq!(arena.used(), 32);

        // Still the most recent allocation, so a fitting grow succeeds.
        let grown = arena.realloc(block, 64, 1).unwrap();
        assert_eq!(grown.offset(), block.offset());
    }

    #[test]
    fn clear_is_idempotent_and_restarts_from_the_origin() {
        let mut buf = [0u8; 128];
        let mut arena = Arena::new(&mut buf);
        let first = arena.alloc(16, 4).unwrap();
        arena.alloc(16, 4).unwrap();

        arena.clear();
        arena.clear();
        assert_eq!(arena.used(), 0);

        let fresh = arena.alloc(16, 4).unwrap();
        assert_eq!(fresh.offset(), first.offset());
    }

    #[test]
    fn zero_sized_realloc_degenerates_to_alloc() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let empty = arena.alloc(0, 1).unwrap();
        assert!(empty.is_empty());

        let block = arena.realloc(empty, 16, 1).unwrap();
        assert_eq!(block.len(), 16);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_alignment_asserts() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let _ = arena.alloc(8, 3);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn foreign_block_asserts() {
        let mut buf = [0u8; 16];
        let mut arena = Arena::new(&mut buf);
        let _ = arena.realloc(Block::new(64, 8), 16, 1);
    }
}
