//! Debug-only invariant checks.
//!
//! Every macro here expands to nothing in release builds (`debug_assert!`
//! is compiled out when `debug_assertions` is off), so none of this has a
//! cost on the hot path. Each one documents the invariant it enforces so a
//! failing assertion in a debug build points straight at the violated
//! property instead of a bare line number.

/// INV-BLOCK-01: `try_acquire` never hands out a region past the block's
/// capacity (`offset + chunks <= chunks_per_block`).
macro_rules! inv_block_bounds {
    ($offset:expr, $chunks:expr, $capacity:expr) => {
        debug_assert!(
            $offset + $chunks <= $capacity,
            "INV-BLOCK-01: acquired region [{}, {}) exceeds block capacity {}",
            $offset,
            $offset + $chunks,
            $capacity
        );
    };
}

/// INV-BLOCK-02: a block is only reset when no outstanding handle still
/// references it.
macro_rules! inv_reset_requires_drained {
    ($acquires:expr) => {
        debug_assert!(
            $acquires == 0,
            "INV-BLOCK-02: block reset with {} outstanding acquire(s)",
            $acquires
        );
    };
}

/// INV-HANDLE-01: a handle's `state` only ever moves Recorded -> Utilized,
/// never the reverse, and is never read before being set to Recorded.
macro_rules! inv_state_forward_only {
    ($old:expr, $new:expr) => {
        debug_assert!(
            matches!(
                ($old, $new),
                (crate::handle::State::Recorded, crate::handle::State::Utilized)
                    | (crate::handle::State::Utilized, crate::handle::State::Utilized)
            ),
            "INV-HANDLE-01: state regressed from {:?} to {:?}",
            $old,
            $new
        );
    };
}

/// INV-QUEUE-01: `head` and `tail` are never null once the queue has been
/// constructed (the sentinel guarantees this for the life of the queue).
macro_rules! inv_queue_not_null {
    ($ptr:expr) => {
        debug_assert!(!$ptr.is_null(), "INV-QUEUE-01: head/tail pointer is null");
    };
}

/// INV-QUEUE-02: `size()` never goes negative — every decrement is paired
/// with a prior increment.
macro_rules! inv_size_non_negative {
    ($size:expr) => {
        debug_assert!($size >= 0, "INV-QUEUE-02: queue size went negative: {}", $size);
    };
}

pub(crate) use inv_block_bounds;
pub(crate) use inv_queue_not_null;
pub(crate) use inv_reset_requires_drained;
pub(crate) use inv_size_non_negative;
pub(crate) use inv_state_forward_only;
