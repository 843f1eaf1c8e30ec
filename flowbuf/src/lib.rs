//! # flowbuf - Bounded queues with adjustable admission
//!
//! Two FIFO queues behind one [`BoundedQueue`] trait:
//!
//! - [`LockedQueue`]: a mutex-guarded deque whose capacity limit can be
//!   changed at any time, with an optional blocking mode driven by occupancy
//!   watermarks.
//! - [`RingQueue`]: a lock-free single-producer single-consumer ring whose
//!   slots are claimed by compare-and-swap on two cursors. Its size is fixed
//!   at construction.
//!
//! A full queue or an empty queue is an ordinary outcome, not an error.
//!
//! ## Lock-based queue
//!
//! ```rust
//! use flowbuf::LockedQueue;
//!
//! let queue = LockedQueue::with_capacity(2);
//! assert!(queue.try_push('a').is_ok());
//! assert!(queue.try_push('b').is_ok());
//! assert_eq!(queue.try_push('c'), Err('c'));
//!
//! // Raising the limit admits more items immediately.
//! queue.set_capacity(3);
//! assert!(queue.try_push('c').is_ok());
//! assert_eq!(queue.try_pop(), Some('a'));
//! ```
//!
//! ### Blocking mode
//!
//! A blocked push sleeps until the queue drains to 30% of its limit; a
//! blocked pop sleeps until it fills to 70%. Workers call
//! [`LockedQueue::notify`] after each burst, and [`LockedQueue::wake_all`]
//! releases everyone once the cancellation predicate turns true.
//!
//! ```rust
//! use flowbuf::LockedQueue;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let stop = AtomicBool::new(false);
//! let queue = LockedQueue::with_capacity(10);
//!
//! queue.push_blocking(1, || stop.load(Ordering::Relaxed)).unwrap();
//! assert_eq!(queue.pop_blocking(|| stop.load(Ordering::Relaxed)), Some(1));
//! ```
//!
//! ## Lock-free ring
//!
//! ```rust
//! use flowbuf::{BoundedQueue, CapacityUpdate, RingQueue};
//!
//! let ring = RingQueue::new(4)?;
//! ring.try_push(7u32).unwrap();
//! assert_eq!(ring.len(), 1);
//!
//! // The ring keeps its size no matter what is requested.
//! assert_eq!(BoundedQueue::set_capacity(&ring, 100), CapacityUpdate::Fixed);
//! assert_eq!(ring.capacity(), 4);
//! # Ok::<(), flowbuf::FlowBufError>(())
//! ```
//!
//! ## Choosing at runtime
//!
//! ```rust
//! use flowbuf::{BoundedQueue, LockedQueue, RingQueue};
//! use std::sync::Arc;
//!
//! let fixed = true;
//! let queue: Arc<dyn BoundedQueue<u8>> = if fixed {
//!     Arc::new(RingQueue::new(1024)?)
//! } else {
//!     Arc::new(LockedQueue::with_capacity(1024))
//! };
//! assert_eq!(queue.capacity(), 1024);
//! # Ok::<(), flowbuf::FlowBufError>(())
//! ```

pub use error::FlowBufError;
pub use locked::{LockedQueue, DEFAULT_LIMIT};
pub use queue::{BoundedQueue, CapacityUpdate};
pub use ring::{RingQueue, DEFAULT_SLOTS, MAX_SLOTS};

pub(crate) mod common;
pub mod error;
pub mod locked;
#[cfg(all(test, feature = "loom"))]
pub(crate) mod loom;
pub mod queue;
pub mod ring;
pub(crate) mod sync;
mod trace_macro;
