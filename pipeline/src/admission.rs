//! What a loop does when the queue refuses a transfer.

use flowbuf::{BoundedQueue, LockedQueue};
use std::sync::Arc;

use crate::halt::Halt;

/// Admission policy, fixed when the pipeline is built.
#[derive(Debug)]
pub enum Admission<T> {
    /// A refused transfer ends the burst. Works with any queue.
    Truncating(Arc<dyn BoundedQueue<T>>),
    /// A refused transfer waits for the opposite watermark or for halt.
    Blocking(Arc<LockedQueue<T>>),
}

impl<T: Send + 'static> Admission<T> {
    pub fn queue(&self) -> &dyn BoundedQueue<T> {
        match self {
            Admission::Truncating(queue) => queue.as_ref(),
            Admission::Blocking(queue) => queue.as_ref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Admission::Truncating(_) => "truncating",
            Admission::Blocking(_) => "blocking",
        }
    }

    /// Offers `item` to the queue. A refused item is handed back, either at
    /// once or, when blocking, after halt cancels the wait.
    pub fn push(&self, item: T, halt: &Halt) -> Result<(), T> {
        match self {
            Admission::Truncating(queue) => queue.try_push(item),
            Admission::Blocking(queue) => queue.push_blocking(item, || halt.is_raised()),
        }
    }

    pub fn pop(&self, halt: &Halt) -> Option<T> {
        match self {
            Admission::Truncating(queue) => queue.try_pop(),
            Admission::Blocking(queue) => queue.pop_blocking(|| halt.is_raised()),
        }
    }

    /// End-of-burst hook: lets a waiting peer re-check its watermark.
    pub fn end_burst(&self) {
        if let Admission::Blocking(queue) = self {
            queue.notify();
        }
    }

    /// Wakes every waiter so it can observe halt.
    pub fn release_waiters(&self) {
        if let Admission::Blocking(queue) = self {
            queue.wake_all();
        }
    }
}
