//! Lock-free single-producer single-consumer ring of item slots.
//!
//! Every slot is either empty (a null pointer) or owns one boxed item. Both
//! ends claim a slot by advancing their cursor with compare-and-swap and only
//! then touch the slot contents:
//!
//! - push: slot at the push cursor is empty, CAS the cursor forward, store
//!   the item;
//! - pop: slot at the pop cursor is occupied, CAS the cursor forward, swap
//!   the contents out for empty.
//!
//! Because the store happens after the claim, a slot whose push has been
//! claimed but not yet written still reads as empty. The consumer checks the
//! slot itself, never the cursor distance, before popping, which keeps the
//! full/empty distinction exact even though both cursors can point at the
//! same index in either state.

use crate::{
    common::{likely, unlikely, wrap_next},
    error::FlowBufError,
    flowbuf_trace,
    queue::{BoundedQueue, CapacityUpdate},
    sync::{AtomicPtr, AtomicUsize, Ordering},
};
use crossbeam::utils::CachePadded;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

/// Slot count used when no other size is configured.
pub const DEFAULT_SLOTS: usize = 32_768;

/// Largest slot count accepted by [`RingQueue::new`].
pub const MAX_SLOTS: usize = 1 << 28;

pub struct RingQueue<T> {
    slots: Box<[AtomicPtr<T>]>,
    push_cursor: CachePadded<AtomicUsize>,
    pop_cursor: CachePadded<AtomicUsize>,
    _owns: PhantomData<T>,
}

// Safety: items move between threads through the slots, which only requires
// `T: Send`. Each slot's contents are owned by exactly one side at a time.
unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    pub fn new(slots: usize) -> Result<Self, FlowBufError> {
        if slots == 0 {
            return Err(FlowBufError::ZeroCapacity);
        }
        if slots > MAX_SLOTS {
            return Err(FlowBufError::CapacityTooLarge {
                requested: slots,
                max: MAX_SLOTS,
            });
        }

        let slots = (0..slots)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(RingQueue {
            slots,
            push_cursor: CachePadded::new(AtomicUsize::new(0)),
            pop_cursor: CachePadded::new(AtomicUsize::new(0)),
            _owns: PhantomData,
        })
    }

    /// Number of slots; fixed for the life of the queue.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_vacant(self.pop_cursor.load(Ordering::Acquire))
    }

    pub fn is_full(&self) -> bool {
        !self.is_vacant(self.push_cursor.load(Ordering::Acquire))
    }

    /// Occupied slot count derived from the cursors.
    ///
    /// When the cursors coincide the slot contents decide between empty and
    /// full. The result is a snapshot and never exceeds the capacity.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        if self.is_full() {
            return self.capacity();
        }
        let push = self.push_cursor.load(Ordering::Acquire);
        let pop = self.pop_cursor.load(Ordering::Acquire);
        (push + self.capacity() - pop) % self.capacity()
    }

    /// Stores `item` in the slot at the push cursor, or hands it back if that
    /// slot is still occupied.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut claimed = self.push_cursor.load(Ordering::Acquire);
        loop {
            if unlikely(!self.is_vacant(claimed)) {
                flowbuf_trace!(cursor = claimed, "ring full");
                return Err(item);
            }
            match self.push_cursor.compare_exchange_weak(
                claimed,
                wrap_next(claimed, self.capacity()),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => claimed = current,
            }
        }

        let boxed = Box::into_raw(Box::new(item));
        self.slots[claimed].store(boxed, Ordering::Release);
        Ok(())
    }

    /// Takes the item from the slot at the pop cursor, if one has been
    /// written there.
    pub fn try_pop(&self) -> Option<T> {
        let mut claimed = self.pop_cursor.load(Ordering::Acquire);
        loop {
            if self.is_vacant(claimed) {
                return None;
            }
            match self.pop_cursor.compare_exchange_weak(
                claimed,
                wrap_next(claimed, self.capacity()),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => claimed = current,
            }
        }

        let taken = self.slots[claimed].swap(ptr::null_mut(), Ordering::AcqRel);
        if likely(!taken.is_null()) {
            // Safety: non-null slot pointers come from `Box::into_raw` in
            // `try_push`, and the swap above gives us sole ownership.
            Some(*unsafe { Box::from_raw(taken) })
        } else {
            None
        }
    }

    #[inline(always)]
    fn is_vacant(&self, index: usize) -> bool {
        self.slots[index].load(Ordering::Acquire).is_null()
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            let leftover = slot.swap(ptr::null_mut(), Ordering::Acquire);
            if !leftover.is_null() {
                // Safety: see `try_pop`; `&mut self` rules out concurrent access.
                drop(unsafe { Box::from_raw(leftover) });
            }
        }
    }
}

impl<T> fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("push_cursor", &self.push_cursor.load(Ordering::Relaxed))
            .field("pop_cursor", &self.pop_cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Send> BoundedQueue<T> for RingQueue<T> {
    fn try_push(&self, item: T) -> Result<(), T> {
        RingQueue::try_push(self, item)
    }

    fn try_pop(&self) -> Option<T> {
        RingQueue::try_pop(self)
    }

    fn len(&self) -> usize {
        RingQueue::len(self)
    }

    fn capacity(&self) -> usize {
        RingQueue::capacity(self)
    }

    /// The ring is sized once; capacity requests are ignored.
    fn set_capacity(&self, _limit: usize) -> CapacityUpdate {
        CapacityUpdate::Fixed
    }

    fn name(&self) -> &'static str {
        "ring"
    }
}
