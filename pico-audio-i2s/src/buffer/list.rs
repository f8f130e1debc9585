//! Intrusive singly linked lists over arena slot indices.
//!
//! Lists never allocate: the link lives in the slot. Callers serialize all
//! access to one list with that list's lock; the lists themselves only
//! check the single-membership rule.

use core::sync::atomic::Ordering;

use super::BufferSlot;

/// List terminator.
pub(crate) const NIL: u8 = u8::MAX;

fn link<const WORDS: usize>(slots: &[BufferSlot<WORDS>], index: u8) {
    let slot = &slots[index as usize];
    assert!(!slot.is_queued(), "buffer {} is already on a list", index);
    debug_assert_eq!(slot.next.load(Ordering::Relaxed), NIL);
    slot.queued.store(true, Ordering::Release);
}

fn unlink<const WORDS: usize>(slots: &[BufferSlot<WORDS>], index: u8) -> u8 {
    let slot = &slots[index as usize];
    let next = slot.next.swap(NIL, Ordering::AcqRel);
    slot.queued.store(false, Ordering::Release);
    next
}

/// LIFO list of empty buffers. Order is unobservable, so push and pop
/// both work at the head.
pub(crate) struct FreeList {
    head: u8,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        FreeList { head: NIL, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push<const WORDS: usize>(&mut self, slots: &[BufferSlot<WORDS>], index: u8) {
        link(slots, index);
        slots[index as usize].next.store(self.head, Ordering::Release);
        self.head = index;
        self.len += 1;
    }

    pub fn pop<const WORDS: usize>(&mut self, slots: &[BufferSlot<WORDS>]) -> Option<u8> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        self.head = unlink(slots, index);
        self.len -= 1;
        Some(index)
    }

    pub fn iter<'s, const WORDS: usize>(
        &self,
        slots: &'s [BufferSlot<WORDS>],
    ) -> impl Iterator<Item = u8> + 's {
        walk(slots, self.head)
    }
}

/// FIFO list of filled buffers, appended at the tail.
pub(crate) struct PreparedList {
    head: u8,
    tail: u8,
    len: usize,
}

impl PreparedList {
    pub const fn new() -> Self {
        PreparedList {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push_back<const WORDS: usize>(&mut self, slots: &[BufferSlot<WORDS>], index: u8) {
        link(slots, index);
        if self.tail == NIL {
            self.head = index;
        } else {
            slots[self.tail as usize].next.store(index, Ordering::Release);
        }
        self.tail = index;
        self.len += 1;
    }

    pub fn pop_front<const WORDS: usize>(&mut self, slots: &[BufferSlot<WORDS>]) -> Option<u8> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        self.head = unlink(slots, index);
        if self.head == NIL {
            self.tail = NIL;
        }
        self.len -= 1;
        Some(index)
    }

    pub fn iter<'s, const WORDS: usize>(
        &self,
        slots: &'s [BufferSlot<WORDS>],
    ) -> impl Iterator<Item = u8> + 's {
        walk(slots, self.head)
    }
}

fn walk<const WORDS: usize>(slots: &[BufferSlot<WORDS>], head: u8) -> impl Iterator<Item = u8> + '_ {
    let mut cursor = head;
    core::iter::from_fn(move || {
        if cursor == NIL {
            return None;
        }
        let index = cursor;
        cursor = slots[index as usize].next.load(Ordering::Acquire);
        Some(index)
    })
}
