//! Mutex-protected queue with an adjustable limit and watermark blocking.

use crate::{
    common::{watermark, HIGH_WATERMARK, LOW_WATERMARK},
    flowbuf_trace,
    queue::{BoundedQueue, CapacityUpdate},
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Limit used by [`LockedQueue::new`].
pub const DEFAULT_LIMIT: usize = 1_000_000;

/// A FIFO guarded by one mutex, bounded by a limit that can change at any
/// time.
///
/// Besides the non-blocking [`try_push`](LockedQueue::try_push) and
/// [`try_pop`](LockedQueue::try_pop), the queue offers a blocking mode:
/// [`push_blocking`](LockedQueue::push_blocking) sleeps until the queue has
/// drained to the low watermark (30% of the limit) and
/// [`pop_blocking`](LockedQueue::pop_blocking) sleeps until it has filled to
/// the high watermark (70%). Watermarks are recomputed from the limit in force
/// at every check, so a capacity change between sleeping and waking is always
/// honoured.
pub struct LockedQueue<T> {
    items: Mutex<VecDeque<T>>,
    limit: AtomicUsize,
    space: Condvar,
    data: Condvar,
}

impl<T> LockedQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LIMIT)
    }

    pub fn with_capacity(limit: usize) -> Self {
        LockedQueue {
            items: Mutex::new(VecDeque::new()),
            limit: AtomicUsize::new(limit),
            space: Condvar::new(),
            data: Condvar::new(),
        }
    }

    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity() {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.limit.load(Ordering::Acquire)
    }

    /// Replaces the limit and wakes blocked pushers so they re-check it.
    ///
    /// The wakeup is sent under the lock, like [`wake_all`](Self::wake_all),
    /// so a pusher between its predicate check and parking cannot miss it.
    pub fn set_capacity(&self, limit: usize) {
        let _items = self.items.lock();
        self.limit.store(limit, Ordering::Release);
        self.space.notify_all();
    }

    pub fn low_watermark(&self) -> usize {
        watermark(self.capacity(), LOW_WATERMARK)
    }

    pub fn high_watermark(&self) -> usize {
        watermark(self.capacity(), HIGH_WATERMARK)
    }

    /// Pushes `item`, sleeping while the queue is full.
    ///
    /// A full queue suspends the caller until the length falls to the low
    /// watermark, then the push is retried with the same item. Returns the
    /// item if `cancelled` reports true before it could be enqueued.
    pub fn push_blocking<F>(&self, item: T, cancelled: F) -> Result<(), T>
    where
        F: Fn() -> bool,
    {
        let mut items = self.items.lock();
        loop {
            if items.len() < self.capacity() {
                items.push_back(item);
                return Ok(());
            }
            if cancelled() {
                return Err(item);
            }

            // A consumer may be asleep waiting for data this burst has not
            // announced yet.
            self.data.notify_one();
            flowbuf_trace!(
                len = items.len(),
                low_watermark = self.low_watermark(),
                "push blocked"
            );
            while !self.drained(&items) && !cancelled() {
                self.space.wait(&mut items);
            }
        }
    }

    /// Pops the oldest item, sleeping while the queue is empty.
    ///
    /// An empty queue suspends the caller until the length reaches the high
    /// watermark. Returns `None` if `cancelled` reports true first.
    pub fn pop_blocking<F>(&self, cancelled: F) -> Option<T>
    where
        F: Fn() -> bool,
    {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if cancelled() {
                return None;
            }

            self.space.notify_one();
            flowbuf_trace!(high_watermark = self.high_watermark(), "pop blocked");
            while !self.filled(&items) && !cancelled() {
                self.data.wait(&mut items);
            }
        }
    }

    /// Wakes at most one blocked pusher and one blocked popper.
    pub fn notify(&self) {
        self.space.notify_one();
        self.data.notify_one();
    }

    /// Wakes every blocked caller.
    ///
    /// Taking the lock orders this wakeup after any waiter's predicate check,
    /// so a cancellation flag set before the call cannot be missed.
    pub fn wake_all(&self) {
        let _items = self.items.lock();
        self.space.notify_all();
        self.data.notify_all();
    }

    fn drained(&self, items: &VecDeque<T>) -> bool {
        let limit = self.capacity();
        items.len() < limit && items.len() <= watermark(limit, LOW_WATERMARK)
    }

    fn filled(&self, items: &VecDeque<T>) -> bool {
        !items.is_empty() && items.len() >= watermark(self.capacity(), HIGH_WATERMARK)
    }
}

impl<T> Default for LockedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<T: Send> BoundedQueue<T> for LockedQueue<T> {
    fn try_push(&self, item: T) -> Result<(), T> {
        LockedQueue::try_push(self, item)
    }

    fn try_pop(&self) -> Option<T> {
        LockedQueue::try_pop(self)
    }

    fn len(&self) -> usize {
        LockedQueue::len(self)
    }

    fn capacity(&self) -> usize {
        LockedQueue::capacity(self)
    }

    fn set_capacity(&self, limit: usize) -> CapacityUpdate {
        LockedQueue::set_capacity(self, limit);
        CapacityUpdate::Applied
    }

    fn name(&self) -> &'static str {
        "locked"
    }
}
