//! A fixed-capacity arena: bump-pointer allocation, atomic outstanding-use
//! count, and an explicit seal flag gating reset.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

use crate::invariants::{inv_block_bounds, inv_reset_requires_drained};
use crate::metrics::Metrics;

/// A region handed out by [`Block::try_acquire`]: a raw, unaligned-checked
/// pointer into the block's arena, plus the chunk offset it started at
/// (kept for provenance — `UniqueData` stores it alongside a pointer back
/// to this block so release never needs to search for where a handle came
/// from).
pub(crate) struct Region {
    pub(crate) ptr: *mut u8,
    pub(crate) chunk_offset: u32,
}

/// A single arena of `chunks_per_block` fixed-size chunks.
///
/// Allocation only ever bumps `offset` forward; there is no free list.
/// Once every handle carved from a block has been released and the block
/// has been sealed (its cursor ran off the end), the next allocation
/// attempt resets `offset` to zero and the block starts over. A block is
/// never freed individually — `BlockList` owns it for the life of the
/// `Pool`.
pub(crate) struct Block {
    arena: NonNull<u8>,
    layout: Layout,
    chunk_bytes: usize,
    chunks_per_block: usize,
    offset: CachePadded<Cell<usize>>,
    acquires: CachePadded<AtomicI64>,
    sealed: AtomicBool,
}

// SAFETY: `arena` is only ever written through the non-overlapping regions
// handed out by `try_acquire`, which itself is driven by a single owner
// (the `Pool`, whose allocation-side methods take `&mut self`). Concurrent
// access to *already acquired* regions is the caller's business, same as
// any other allocator. `offset` is a plain `Cell`, not an atomic — it is
// read and written only by that single owner, exactly like `arena`; the
// `Sync` impl below is sound only because `Pool` upholds that discipline
// (see `spec.md` §5: "`Block.offset`... mutated only by the Pool owner").
unsafe impl Send for Block {}
unsafe impl Sync for Block {}

impl Block {
    /// `chunk_bytes` is the arena's alignment as well as its granularity —
    /// `Block::try_acquire` hands out pointers at multiples of
    /// `chunk_bytes` from the arena base, so the base itself must be
    /// aligned that strictly (a plain `Vec<u8>` is only guaranteed
    /// byte-alignment, which is not enough once a payload's natural
    /// alignment exceeds what the global allocator happens to return).
    /// `PoolConfig::new` already asserts `chunk_bytes` is a power of two.
    pub(crate) fn new(chunk_bytes: usize, chunks_per_block: usize) -> Self {
        let layout = Layout::from_size_align(chunk_bytes * chunks_per_block, chunk_bytes)
            .expect("chunk_bytes * chunks_per_block must not overflow isize");
        // SAFETY: `layout` has non-zero size whenever `chunks_per_block > 0`,
        // which `PoolConfig::new` asserts.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let arena = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Block {
            arena,
            layout,
            chunk_bytes,
            chunks_per_block,
            offset: CachePadded::new(Cell::new(0)),
            acquires: CachePadded::new(AtomicI64::new(0)),
            sealed: AtomicBool::new(false),
        }
    }

    /// Attempts to reset the block for reuse. Only succeeds if the block is
    /// sealed (its cursor already ran past the end) and has zero
    /// outstanding acquires. Called at the head of every `try_acquire`.
    fn maybe_reset(&self, metrics: &Metrics) -> bool {
        if self.sealed.load(Ordering::Acquire) && self.acquires.load(Ordering::Acquire) == 0 {
            inv_reset_requires_drained!(self.acquires.load(Ordering::Relaxed));
            self.offset.set(0);
            self.sealed.store(false, Ordering::Release);
            metrics.record_block_reset();
            true
        } else {
            false
        }
    }

    /// Carves out `chunks` contiguous chunks, returning `None` if the block
    /// is sealed or doesn't have enough room left (in which case it seals
    /// itself so the next caller doesn't retry the same dead cursor).
    ///
    /// `offset` is read and bumped without a CAS: `try_acquire` is only
    /// ever called by the single thread that owns this block's `Pool`
    /// (`Pool::try_acquire`/`acquire` take `&mut self`), so there is no
    /// concurrent writer to race against, per `spec.md` §4.1/§5.
    pub(crate) fn try_acquire(&self, chunks: usize, metrics: &Metrics) -> Option<Region> {
        self.maybe_reset(metrics);

        if self.sealed.load(Ordering::Acquire) {
            return None;
        }

        let current = self.offset.get();
        if current + chunks > self.chunks_per_block {
            self.sealed.store(true, Ordering::Release);
            return None;
        }
        self.offset.set(current + chunks);
        inv_block_bounds!(current, chunks, self.chunks_per_block);
        self.acquires.fetch_add(1, Ordering::AcqRel);
        // SAFETY: [current*chunk_bytes, (current+chunks)*chunk_bytes) was
        // just exclusively reserved by the bump above; no other acquirer
        // can observe an overlapping range.
        let ptr = unsafe { self.arena.as_ptr().add(current * self.chunk_bytes) };
        Some(Region {
            ptr,
            chunk_offset: current as u32,
        })
    }

    /// Releases one outstanding acquire. Does not itself reset the block —
    /// that happens lazily, the next time someone tries to allocate from it.
    pub(crate) fn release(&self) {
        self.acquires.fetch_sub(1, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub(crate) fn outstanding_acquires(&self) -> i64 {
        self.acquires.load(Ordering::Acquire)
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: `arena`/`layout` were produced together by `Block::new`
        // and never exposed for any other deallocation; `acquires == 0` is
        // a precondition of dropping a `Pool` (spec.md §7,
        // `UnrecoverablePreconditionViolation`), enforced by the caller, not
        // re-checked here since a release build trusts it same as the rest
        // of this crate's documented preconditions.
        unsafe { alloc::dealloc(self.arena.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_bumps_offset_and_acquires() {
        let metrics = Metrics::new();
        let block = Block::new(64, 4);

        let r0 = block.try_acquire(1, &metrics).unwrap();
        assert_eq!(r0.chunk_offset, 0);
        let r1 = block.try_acquire(2, &metrics).unwrap();
        assert_eq!(r1.chunk_offset, 1);
        assert_eq!(block.outstanding_acquires(), 2);
    }

    #[test]
    fn seals_when_exhausted() {
        let metrics = Metrics::new();
        let block = Block::new(64, 2);
        assert!(block.try_acquire(2, &metrics).is_some());
        assert!(block.try_acquire(1, &metrics).is_none());
    }

    #[test]
    fn resets_only_after_fully_drained() {
        let metrics = Metrics::new();
        let block = Block::new(64, 2);
        let r0 = block.try_acquire(2, &metrics).unwrap();
        assert!(block.try_acquire(1, &metrics).is_none(), "sealed, no room left");

        // Still outstanding: releasing nothing yet, so no reset happens.
        assert!(block.try_acquire(1, &metrics).is_none());

        block.release();
        let _ = r0;
        // Now drained: next attempt should reset and succeed.
        let r2 = block.try_acquire(1, &metrics).unwrap();
        assert_eq!(r2.chunk_offset, 0);
    }
}
