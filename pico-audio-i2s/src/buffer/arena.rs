use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::list::NIL;
use super::SampleBuffer;

/// One arena slot: buffer storage plus the intrusive list link.
pub struct BufferSlot<const WORDS: usize> {
    buffer: UnsafeCell<SampleBuffer<WORDS>>,
    /// Index of the next slot on whichever list holds this one, or [`NIL`].
    pub(crate) next: AtomicU8,
    /// Set while the slot sits on a free or prepared list.
    pub(crate) queued: AtomicBool,
}

// SAFETY: Link fields are atomics and only change under the owning list's
// lock. Buffer storage is reached through a slot index that exactly one
// party holds at a time: a list (under its lock), an `AudioBuffer` guard,
// the DMA engine or a connection's carry-over.
unsafe impl<const WORDS: usize> Sync for BufferSlot<WORDS> {}

impl<const WORDS: usize> BufferSlot<WORDS> {
    #[allow(clippy::declare_interior_mut_const)]
    const EMPTY: Self = Self::new();

    pub const fn new() -> Self {
        BufferSlot {
            buffer: UnsafeCell::new(SampleBuffer::empty()),
            next: AtomicU8::new(NIL),
            queued: AtomicBool::new(false),
        }
    }

    /// # Safety
    ///
    /// Caller must hold this slot's index and no other reference to the
    /// buffer may be live.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn buffer_mut(&self) -> &mut SampleBuffer<WORDS> {
        unsafe { &mut *self.buffer.get() }
    }

    /// # Safety
    ///
    /// Caller must hold this slot's index and no mutable reference may be live.
    pub(crate) unsafe fn buffer(&self) -> &SampleBuffer<WORDS> {
        unsafe { &*self.buffer.get() }
    }

    pub(crate) fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }
}

impl<const WORDS: usize> Default for BufferSlot<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statically allocatable storage for `N` buffers of `WORDS` words each.
///
/// A [`Stream`](crate::Stream) claims the whole arena and carves it into its
/// producer and consumer pools. An arena backs at most one stream at a time.
///
/// ```ignore
/// static ARENA: BufferArena<6, 1024> = BufferArena::new();
/// ```
pub struct BufferArena<const N: usize, const WORDS: usize> {
    slots: [BufferSlot<WORDS>; N],
    claimed: AtomicBool,
}

impl<const N: usize, const WORDS: usize> BufferArena<N, WORDS> {
    pub const fn new() -> Self {
        assert!(N < NIL as usize, "arena indices must fit below the list terminator");
        BufferArena {
            slots: [BufferSlot::<WORDS>::EMPTY; N],
            claimed: AtomicBool::new(false),
        }
    }

    /// Number of buffers in the arena.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Take exclusive use of the slots. `None` if a stream already holds them.
    pub(crate) fn claim(&self) -> Option<&[BufferSlot<WORDS>]> {
        let won = critical_section::with(|_| {
            if self.claimed.load(Ordering::Relaxed) {
                false
            } else {
                self.claimed.store(true, Ordering::Relaxed);
                true
            }
        });
        won.then_some(&self.slots[..])
    }

    pub(crate) fn claimed_flag(&self) -> &AtomicBool {
        &self.claimed
    }

    /// `true` while a [`Stream`](crate::Stream) owns the slots.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

impl<const N: usize, const WORDS: usize> Default for BufferArena<N, WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let arena: BufferArena<4, 8> = BufferArena::new();
        assert_eq!(arena.capacity(), 4);
        assert!(!arena.is_claimed());
        let slots = arena.claim().unwrap();
        assert_eq!(slots.len(), 4);
        assert!(arena.is_claimed());
        assert!(arena.claim().is_none());
        arena.claimed_flag().store(false, Ordering::Release);
        assert!(arena.claim().is_some());
    }

    #[test]
    fn fresh_slots_are_unlinked() {
        let arena: BufferArena<2, 8> = BufferArena::new();
        let slots = arena.claim().unwrap();
        for s in slots {
            assert_eq!(s.next.load(Ordering::Relaxed), NIL);
            assert!(!s.is_queued());
        }
    }
}
