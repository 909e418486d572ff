//! Intrusive, wait-free-push, single-consumer MPSC queue.
//!
//! Nodes are the handles themselves (see [`handle`](crate::handle)) — the
//! queue never allocates anything per message on its own hot path. This is
//! a Michael & Scott-style linked queue with one twist forced by that
//! intrusiveness: a classic MS-queue keeps the node it returns a value from
//! alive in the chain (as the new dummy) and frees the node it detaches.
//! Here the *detached* node usually carries the value, because the value
//! and the node are the same allocation — so the usual roles are reversed,
//! except at the one point where that reversal would leave `head`/`tail`
//! referencing memory already handed to a caller (draining the queue down
//! to its last pending item). That one case pays for an extra heap
//! allocation to rebox the payload independently of the queue's own
//! bookkeeping node; every other pop is a straight handoff of the node
//! itself. See `DESIGN.md` for the full account.

use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::handle::{Node, Reservation, State, UniqueData};
use crate::invariants::{inv_queue_not_null, inv_size_non_negative, inv_state_forward_only};
use crate::metrics::Metrics;

pub struct Queue<T> {
    head: CachePadded<AtomicPtr<Node<T>>>,
    tail: CachePadded<AtomicPtr<Node<T>>>,
    size: AtomicI64,
    metrics: Metrics,
}

// SAFETY: `Queue<T>` hands nodes between threads via atomic CAS on `head`
// and `tail`; it is sound to share across threads exactly when `T` is.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let sentinel = Node::alloc_sentinel();
        Queue {
            head: CachePadded::new(AtomicPtr::new(sentinel)),
            tail: CachePadded::new(AtomicPtr::new(sentinel)),
            size: AtomicI64::new(0),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Best-effort snapshot of the number of items currently enqueued.
    /// Backed by an atomic delta counter, not a traversal — may be stale
    /// by the time the caller observes it under concurrent pushes/pops.
    pub fn size(&self) -> i64 {
        let s = self.size.load(Ordering::Relaxed);
        inv_size_non_negative!(s);
        s
    }

    /// Publishes a handle. Returns `false` only when `handle` is `None` —
    /// the queue itself is otherwise never "full" (it grows one node per
    /// push). Producers may call this concurrently; it never blocks.
    pub fn push(&self, handle: Option<UniqueData<T>>) -> bool {
        let Some(handle) = handle else { return false };
        let node = handle.into_raw();

        let mut backoff = Backoff::new();
        loop {
            let t = self.tail.load(Ordering::Acquire);
            // SAFETY: `t` was last published by a successful CAS below (or
            // is the sentinel from `new`); nodes are never freed while
            // reachable from `tail`.
            let n = unsafe { (*t).next.load(Ordering::Acquire) };
            if n.is_null() {
                let cas = unsafe {
                    (*t).next.compare_exchange_weak(
                        ptr::null_mut(),
                        node,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                };
                if cas.is_ok() {
                    // Best-effort: if this fails, some other thread's push or
                    // pop already advanced tail past `t` for us.
                    let _ = self
                        .tail
                        .compare_exchange(t, node, Ordering::Release, Ordering::Relaxed);
                    self.size.fetch_add(1, Ordering::Relaxed);
                    self.metrics.record_item_pushed();
                    return true;
                }
            } else {
                // tail lagged behind an already-linked node; help it catch up
                // and retry instead of giving up.
                let _ = self
                    .tail
                    .compare_exchange(t, n, Ordering::Release, Ordering::Relaxed);
            }
            backoff.spin();
        }
    }

    /// Removes and returns the oldest published handle, or `None` if the
    /// queue is empty. Must only be called from a single consumer thread
    /// at a time — concurrent `pop` calls are not supported (see
    /// `DESIGN.md` / `spec.md` §5).
    pub fn pop(&self) -> Option<UniqueData<T>> {
        loop {
            let h = self.head.load(Ordering::Acquire);
            let t = self.tail.load(Ordering::Acquire);
            inv_queue_not_null!(h);

            if h == t {
                // SAFETY: single-consumer discipline — `h`'s state is never
                // written concurrently with this read.
                let state = unsafe { (*h).state };
                if state == State::Recorded {
                    // This is the last pending node. Extract its payload into
                    // an independently-owned handle rather than returning `h`
                    // itself, so `head`/`tail` keep pointing at memory the
                    // queue still legitimately owns (see module docs).
                    let value = unsafe { Node::take_payload(h) };
                    inv_state_forward_only!(state, State::Utilized);
                    unsafe {
                        (*h).state = State::Utilized;
                    }
                    self.size.fetch_sub(1, Ordering::Relaxed);
                    self.metrics.record_item_popped();
                    let rebound: UniqueData<T> = Reservation::new_heap().emplace(value);
                    return Some(rebound);
                }

                let tn = unsafe { (*h).next.load(Ordering::Acquire) };
                if !tn.is_null() {
                    // tail lagged behind a node that's already linked in;
                    // help it catch up and recheck.
                    let _ = self
                        .tail
                        .compare_exchange(t, tn, Ordering::Release, Ordering::Relaxed);
                    continue;
                }
                return None;
            }

            // SAFETY: `h != t`, so `h` is not the current tail and no
            // producer CAS targets `h->next` via a freshly-loaded `tail`.
            let hn = unsafe { (*h).next.load(Ordering::Acquire) };
            self.head.store(hn, Ordering::Release);

            // SAFETY: single-consumer discipline, see above.
            if unsafe { (*h).state } == State::Utilized {
                // A previously-drained shell (the original sentinel, or a
                // node whose payload was already reboxed via the branch
                // above). Reclaim it and keep looking.
                unsafe { Node::reclaim_shell(h) };
                continue;
            }

            let prev_state = unsafe { (*h).state };
            inv_state_forward_only!(prev_state, State::Utilized);
            unsafe {
                (*h).state = State::Utilized;
            }
            self.size.fetch_sub(1, Ordering::Relaxed);
            self.metrics.record_item_popped();
            return Some(unsafe { UniqueData::from_raw(h) });
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        let h = *self.head.get_mut();
        // SAFETY: after draining to `None`, `head == tail` points at a shell
        // with no live payload that was never handed to any caller.
        unsafe { Node::reclaim_shell(h) };
    }
}
