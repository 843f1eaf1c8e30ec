//! The capability shared by every queue variant.

use std::fmt;

/// Outcome of a capacity change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityUpdate {
    /// The new limit governs the next push.
    Applied,
    /// The queue's capacity is fixed at construction; the request was ignored.
    Fixed,
}

/// Thread-safe bounded FIFO transfer.
///
/// Rejection is an ordinary outcome: a full queue hands the item back from
/// [`try_push`](BoundedQueue::try_push) and an empty queue returns `None` from
/// [`try_pop`](BoundedQueue::try_pop). Neither call blocks.
///
/// Implementations differ in how many threads may use each end. The
/// lock-based [`LockedQueue`](crate::LockedQueue) accepts any number of
/// callers; the [`RingQueue`](crate::RingQueue) supports exactly one pusher
/// and one popper.
pub trait BoundedQueue<T>: Send + Sync + fmt::Debug {
    /// Appends `item`, or returns it if the queue is at its limit.
    fn try_push(&self, item: T) -> Result<(), T>;

    /// Removes the oldest item, or returns `None` if the queue is empty.
    fn try_pop(&self) -> Option<T>;

    /// Instantaneous length. May be stale by the time the caller acts on it.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current capacity limit.
    fn capacity(&self) -> usize;

    /// Replaces the capacity limit.
    ///
    /// Shrinking below the current length never evicts; pushes are rejected
    /// until the queue drains under the new limit. Fixed-size variants leave
    /// their capacity untouched and report [`CapacityUpdate::Fixed`].
    fn set_capacity(&self, limit: usize) -> CapacityUpdate;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
