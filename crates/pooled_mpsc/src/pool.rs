//! Growable collection of [`Block`]s plus the allocation service built on
//! top of it.

use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use crate::block::Block;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handle::{Node, Reservation};
use crate::metrics::Metrics;

/// A growable sequence of blocks plus a round-robin allocation cursor.
///
/// Each `Block` lives in its own `Box` so its address is stable across
/// `Vec` reallocation — `UniqueData` carries a raw pointer back to the
/// block it came from, and that pointer must stay valid for the life of
/// the block, not just until the next `push`.
struct BlockList {
    blocks: Vec<Box<Block>>,
    current: usize,
}

impl BlockList {
    fn new() -> Self {
        BlockList {
            blocks: Vec::new(),
            current: 0,
        }
    }

    fn try_grow(&mut self, chunk_bytes: usize, chunks_per_block: usize) -> Result<(), PoolError> {
        self.blocks
            .try_reserve(1)
            .map_err(|_| PoolError::AllocationFailure {
                requested_bytes: chunk_bytes * chunks_per_block,
            })?;
        self.blocks.push(Box::new(Block::new(chunk_bytes, chunks_per_block)));
        self.current = self.blocks.len() - 1;
        Ok(())
    }
}

/// Variable-size allocation service. Serves `Reservation<T>`s out of its
/// pool of blocks, falling back to growing the pool (never directly to the
/// heap — see [`Pool::heap_allocate`] for the explicit opt-in heap path).
///
/// All block-list-mutating operations (`try_acquire`, `acquire`) take
/// `&mut self`: the C++ draft documents "one `Pool` per producer, or an
/// external mutex" as a discipline the caller must uphold; here the
/// compiler enforces it instead. `heap_allocate` and `metrics` take `&self`
/// since they never touch the block list.
pub struct Pool {
    config: PoolConfig,
    blocks: BlockList,
    /// Boxed so its address is stable across a `Pool` move — every
    /// `Reservation` carved from this pool stores a raw pointer back to it
    /// (so `release()` can record `handles_released` without the caller
    /// threading a `Metrics` reference through by hand), and that pointer
    /// must stay valid for the handle's whole life, same as a block's.
    metrics: Box<Metrics>,
}

impl Pool {
    pub fn new(config: PoolConfig) -> Result<Pool, PoolError> {
        let mut blocks = BlockList::new();
        blocks
            .blocks
            .try_reserve(config.initial_blocks)
            .map_err(|_| PoolError::AllocationFailure {
                requested_bytes: config.initial_blocks * config.block_bytes(),
            })?;
        let metrics = Box::new(Metrics::new());
        for _ in 0..config.initial_blocks {
            blocks.blocks.push(Box::new(Block::new(config.chunk_bytes, config.chunks_per_block)));
            metrics.record_block_allocated();
        }
        Ok(Pool { config, blocks, metrics })
    }

    fn chunks_for<T>(&self) -> usize {
        let bytes = size_of::<Node<T>>();
        debug_assert!(
            align_of::<Node<T>>() <= self.config.chunk_bytes,
            "payload alignment {} exceeds chunk size {}; use a larger chunk_bytes",
            align_of::<Node<T>>(),
            self.config.chunk_bytes
        );
        (bytes + self.config.chunk_bytes - 1) / self.config.chunk_bytes
    }

    /// Tries to serve a reservation from the existing blocks; never grows
    /// the pool. Matches `spec.md`'s "`tryAcquire` never grows" contract —
    /// use [`Pool::acquire`] when growth-on-exhaustion is acceptable.
    ///
    /// Bounded to the two attempts `spec.md` §4.2 describes: try the
    /// current block, and on failure advance the cursor once and retry —
    /// never a full scan of every block in the list.
    pub fn try_acquire<T>(&mut self) -> Option<Reservation<T>> {
        let chunks = self.chunks_for::<T>();
        let len = self.blocks.blocks.len();
        if len == 0 {
            return None;
        }
        for attempt in 0..2 {
            if attempt > 0 {
                self.blocks.current = (self.blocks.current + 1) % len;
            }
            let idx = self.blocks.current;
            if let Some(region) = self.blocks.blocks[idx].try_acquire(chunks, &self.metrics) {
                self.metrics.record_handle_from_pool();
                let block_ptr = NonNull::from(self.blocks.blocks[idx].as_ref());
                let metrics_ptr = NonNull::from(self.metrics.as_ref());
                // SAFETY: `region.ptr` points at `chunks * chunk_bytes` freshly
                // reserved, exclusively-owned bytes inside a block this `Pool`
                // keeps alive in `self.blocks` for as long as the block exists.
                // `metrics_ptr` points at `*self.metrics`, boxed, so it stays
                // valid for exactly as long as `block_ptr` does.
                return Some(unsafe { Reservation::new_pool(region.ptr, block_ptr, region.chunk_offset, metrics_ptr) });
            }
        }
        None
    }

    /// Like [`Pool::try_acquire`], but grows the pool by one block and
    /// retries once if every existing block is exhausted.
    pub fn acquire<T>(&mut self) -> Option<Reservation<T>> {
        if let Some(r) = self.try_acquire::<T>() {
            return Some(r);
        }
        if self.grow().is_err() {
            return None;
        }
        self.try_acquire::<T>()
    }

    fn grow(&mut self) -> Result<(), PoolError> {
        let result = self.blocks.try_grow(self.config.chunk_bytes, self.config.chunks_per_block);
        if result.is_ok() {
            self.metrics.record_block_allocated();
        } else {
            self.metrics.record_allocation_failure();
        }
        result
    }

    /// Allocates directly on the heap, bypassing the block pool entirely.
    /// This is the documented overflow valve for payloads larger than a
    /// block, or for callers who don't want pool growth on their hot path.
    pub fn heap_allocate<T>(&self) -> Reservation<T> {
        self.metrics.record_handle_from_heap();
        let metrics_ptr = NonNull::from(self.metrics.as_ref());
        Reservation::new_heap_with_metrics(metrics_ptr)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[cfg(test)]
    pub(crate) fn block_count(&self) -> usize {
        self.blocks.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_serves_from_existing_blocks() {
        let mut pool = Pool::new(PoolConfig::new(64, 4, 1)).unwrap();
        let r = pool.try_acquire::<u64>();
        assert!(r.is_some());
        let h = r.unwrap().emplace(7u64);
        assert_eq!(*h.get(), 7);
    }

    #[test]
    fn try_acquire_does_not_grow_when_exhausted() {
        let mut pool = Pool::new(PoolConfig::new(64, 1, 1)).unwrap();
        let _first = pool.try_acquire::<[u8; 64]>().unwrap();
        assert!(pool.try_acquire::<[u8; 64]>().is_none());
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn acquire_grows_when_exhausted() {
        let mut pool = Pool::new(PoolConfig::new(64, 1, 1)).unwrap();
        let _first = pool.acquire::<[u8; 64]>().unwrap();
        let second = pool.acquire::<[u8; 64]>();
        assert!(second.is_some());
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn dropping_a_handle_allows_its_block_to_be_reused() {
        let mut pool = Pool::new(PoolConfig::new(64, 1, 1)).unwrap();
        let h = pool.try_acquire::<[u8; 32]>().unwrap().emplace([0u8; 32]);
        assert!(pool.try_acquire::<[u8; 32]>().is_none());
        drop(h);
        assert!(pool.try_acquire::<[u8; 32]>().is_some());
        assert_eq!(pool.block_count(), 1, "reused the existing block instead of growing");
    }

    #[test]
    fn heap_allocate_never_touches_the_block_list() {
        let pool = Pool::new(PoolConfig::new(64, 1, 1)).unwrap();
        let h = pool.heap_allocate::<u64>().emplace(9);
        assert_eq!(*h.get(), 9);
        assert_eq!(pool.metrics().snapshot().handles_from_heap, 1);
    }

    #[test]
    fn handles_released_counts_every_real_release() {
        let mut pool = Pool::new(PoolConfig::new(64, 4, 1)).unwrap();

        let pool_handles: Vec<_> = (0..4)
            .map(|i| pool.acquire::<u64>().unwrap().emplace(i))
            .collect();
        let heap_handle = pool.heap_allocate::<u64>().emplace(99);

        assert_eq!(pool.metrics().snapshot().handles_released, 0);

        drop(pool_handles);
        assert_eq!(pool.metrics().snapshot().handles_released, 4);

        drop(heap_handle);
        assert_eq!(pool.metrics().snapshot().handles_released, 5);

        // into_inner releases just as a drop would.
        let another = pool.acquire::<u64>().unwrap().emplace(7);
        assert_eq!(another.into_inner(), 7);
        assert_eq!(pool.metrics().snapshot().handles_released, 6);
    }
}
