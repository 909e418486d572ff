//! Property-based tests for the invariants in `spec.md` §8 / `SPEC_FULL.md` §8.
//!
//! Coverage mirrors the teacher crate's own `tests/property_tests.rs`: one
//! `proptest!` block per invariant, each documented with its `INV-*` tag.

use pooled_mpsc::{Pool, PoolConfig, Queue};
use proptest::prelude::*;

// =============================================================================
// INV-1: Round-trip integrity — a value popped equals the value pushed.
// =============================================================================

proptest! {
    /// INV-1: every value that goes in through `push` comes back unchanged
    /// through `pop`, in the order it was pushed (single producer).
    #[test]
    fn prop_round_trip_preserves_values_and_order(values in prop::collection::vec(any::<u64>(), 0..200)) {
        let mut pool = Pool::new(PoolConfig::new(64, 64, 2)).unwrap();
        let queue: Queue<u64> = Queue::new();

        for &v in &values {
            let handle = pool.acquire::<u64>().unwrap().emplace(v);
            prop_assert!(queue.push(Some(handle)));
        }

        for &v in &values {
            let popped = queue.pop().unwrap();
            prop_assert_eq!(*popped.get(), v);
        }
        prop_assert!(queue.pop().is_none());
    }
}

// =============================================================================
// INV-2: size() tracks pushes/pops exactly under single-threaded use.
// =============================================================================

proptest! {
    /// INV-2: `size()` increases by exactly one per successful push and
    /// decreases by exactly one per successful pop.
    #[test]
    fn prop_size_tracks_pushes_and_pops(ops in prop::collection::vec(prop::bool::ANY, 0..300)) {
        let mut pool = Pool::new(PoolConfig::new(64, 64, 2)).unwrap();
        let queue: Queue<u64> = Queue::new();
        let mut model: i64 = 0;

        for push_op in ops {
            if push_op {
                let handle = pool.acquire::<u64>().unwrap().emplace(0);
                queue.push(Some(handle));
                model += 1;
            } else if queue.pop().is_some() {
                model -= 1;
            }
            prop_assert_eq!(queue.size(), model);
        }
    }
}

// =============================================================================
// INV-3: no leak — dropping a fully-drained queue does not leave any block
// permanently unable to be reused.
// =============================================================================

proptest! {
    /// INV-3: after every handle acquired from a block has been pushed,
    /// popped, and dropped, the block can be reused — the pool never grows
    /// without bound just from steady-state traffic.
    #[test]
    fn prop_no_leak_after_full_drain(rounds in 1usize..20, per_round in 1usize..20) {
        let mut pool = Pool::new(PoolConfig::new(64, 8, 1)).unwrap();
        let queue: Queue<u64> = Queue::new();

        for _ in 0..rounds {
            for i in 0..per_round {
                if let Some(r) = pool.acquire::<u64>() {
                    let h = r.emplace(i as u64);
                    queue.push(Some(h));
                }
            }
            while let Some(h) = queue.pop() {
                drop(h);
            }
        }
        prop_assert!(queue.pop().is_none());
    }
}

// =============================================================================
// INV-4: release is idempotent — Rust's ownership model makes a second
// release on the same handle unreachable code, not a runtime check.
// =============================================================================

#[test]
fn inv4_release_idempotence_is_structural() {
    // A `UniqueData<T>` can only be dropped/released once: `release(self)`
    // and the destructor both consume the value, so the type system rules
    // out calling either a second time. Nothing to property-test here
    // beyond this one compile-time fact, recorded as a named test per
    // `spec.md`'s own invariant numbering.
    let mut pool = Pool::new(PoolConfig::default()).unwrap();
    let h = pool.acquire::<u64>().unwrap().emplace(1);
    h.release();
}
