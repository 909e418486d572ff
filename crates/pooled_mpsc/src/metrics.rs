//! Atomic-counter observability surface.
//!
//! This crate is a hot-path data structure; it does not pull in a logging
//! crate for steady-state operation the way a service-level crate would.
//! Instead, every module bumps a handful of relaxed atomic counters here,
//! and callers snapshot them whenever they want a picture of what the
//! allocator and queue have been doing. Same trade-off `ringmpsc-rs` makes
//! with its own `Metrics`/`MetricsSnapshot` pair.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters. All fields are `AtomicU64` so `Metrics` can be shared via
/// `&Metrics` from every producer and the consumer without a lock.
#[derive(Debug, Default)]
pub struct Metrics {
    handles_from_pool: AtomicU64,
    handles_from_heap: AtomicU64,
    handles_released: AtomicU64,
    blocks_allocated: AtomicU64,
    blocks_reset: AtomicU64,
    allocation_failures: AtomicU64,
    items_pushed: AtomicU64,
    items_popped: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_handle_from_pool(&self) {
        self.handles_from_pool.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handle_from_heap(&self) {
        self.handles_from_heap.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handle_released(&self) {
        self.handles_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_block_allocated(&self) {
        self.blocks_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_block_reset(&self) {
        self.blocks_reset.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_allocation_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_item_pushed(&self) {
        self.items_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_item_popped(&self) {
        self.items_popped.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a best-effort, non-atomic-as-a-whole snapshot of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            handles_from_pool: self.handles_from_pool.load(Ordering::Relaxed),
            handles_from_heap: self.handles_from_heap.load(Ordering::Relaxed),
            handles_released: self.handles_released.load(Ordering::Relaxed),
            blocks_allocated: self.blocks_allocated.load(Ordering::Relaxed),
            blocks_reset: self.blocks_reset.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            items_pushed: self.items_pushed.load(Ordering::Relaxed),
            items_popped: self.items_popped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `Metrics`, cheap to pass around and compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub handles_from_pool: u64,
    pub handles_from_heap: u64,
    pub handles_released: u64,
    pub blocks_allocated: u64,
    pub blocks_reset: u64,
    pub allocation_failures: u64,
    pub items_pushed: u64,
    pub items_popped: u64,
}
