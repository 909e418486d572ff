//! A pooled chunk allocator paired with a wait-free-push, single-consumer
//! MPSC queue.
//!
//! Producers acquire a [`handle::Reservation`] from a [`pool::Pool`],
//! construct a payload into it (`emplace`), and hand the resulting
//! [`handle::UniqueData`] to a [`queue::Queue`]. The queue's nodes *are*
//! the handles — there is no second, per-message allocation on the queue's
//! own hot path. A single consumer drains the queue and, dropping each
//! handle, releases its storage back to the pool (or the heap, for
//! handles that bypassed the pool).
//!
//! ```
//! use pooled_mpsc::{PoolConfig, Pool, Queue};
//!
//! let mut pool = Pool::new(PoolConfig::default()).unwrap();
//! let queue: Queue<u64> = Queue::new();
//!
//! let handle = pool.acquire::<u64>().unwrap().emplace(7);
//! assert!(queue.push(Some(handle)));
//!
//! let popped = queue.pop().unwrap();
//! assert_eq!(*popped.get(), 7);
//! ```

mod backoff;
mod block;
mod config;
mod error;
mod handle;
mod invariants;
mod metrics;
mod pool;
mod queue;

pub use config::PoolConfig;
pub use error::PoolError;
pub use handle::{Reservation, UniqueData};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pool::Pool;
pub use queue::Queue;
