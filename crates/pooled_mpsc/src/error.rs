//! Error surface for the allocator side of the crate.
//!
//! The queue's own failure modes (`push` on a missing handle, `pop` on an
//! empty queue) are not exceptional — they are `bool`/`Option` returns, per
//! `spec.md` §7 and mirroring `ringmpsc_rs::Ring::push`'s own convention.
//! Construction and growth failures, by contrast, are real errors and get
//! a `thiserror`-derived enum, mirroring `ringmpsc_rs::ChannelError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to allocate a block of {requested_bytes} bytes")]
    AllocationFailure { requested_bytes: usize },
}
