use core::cell::RefCell;

use critical_section::Mutex;

use super::list::{FreeList, PreparedList};
use super::BufferSlot;
use crate::event::WaitEvent;
use crate::format::{AudioFormat, SharedFormat};

/// Which end of a stream a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolRole {
    /// Filled by the application.
    Producer,
    /// Drained by the output driver.
    Consumer,
}

/// Sizing of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub format: AudioFormat,
    /// Buffers this pool owns. Zero is valid for the consumer side of a
    /// pass-through stream.
    pub buffer_count: usize,
    pub samples_per_buffer: usize,
}

impl PoolConfig {
    pub const fn new(format: AudioFormat, buffer_count: usize, samples_per_buffer: usize) -> Self {
        PoolConfig {
            format,
            buffer_count,
            samples_per_buffer,
        }
    }
}

/// A format plus a free list and a prepared list.
///
/// Each list has its own critical-section lock, held only for the pointer
/// splice. The wake signal fires after the lock is released.
pub struct BufferPool {
    role: PoolRole,
    format: SharedFormat,
    buffer_count: usize,
    samples_per_buffer: usize,
    free: Mutex<RefCell<FreeList>>,
    prepared: Mutex<RefCell<PreparedList>>,
}

impl BufferPool {
    pub(crate) fn new(role: PoolRole, config: &PoolConfig) -> Self {
        BufferPool {
            role,
            format: SharedFormat::new(config.format),
            buffer_count: config.buffer_count,
            samples_per_buffer: config.samples_per_buffer,
            free: Mutex::new(RefCell::new(FreeList::new())),
            prepared: Mutex::new(RefCell::new(PreparedList::new())),
        }
    }

    /// Which end of the stream this pool serves.
    pub fn role(&self) -> PoolRole {
        self.role
    }

    /// The pool's format. The rate can change while streaming; layout
    /// cannot.
    pub fn format(&self) -> &SharedFormat {
        &self.format
    }

    /// Buffers owned by this pool.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Frame capacity of each buffer.
    pub fn samples_per_buffer(&self) -> usize {
        self.samples_per_buffer
    }

    /// Buffers currently on the free list.
    pub fn free_len(&self) -> usize {
        critical_section::with(|cs| self.free.borrow_ref(cs).len())
    }

    /// Buffers currently on the prepared list.
    pub fn prepared_len(&self) -> usize {
        critical_section::with(|cs| self.prepared.borrow_ref(cs).len())
    }

    // ── Free list ──────────────────────────────────────────────────────

    pub(crate) fn pop_free<const W: usize>(&self, slots: &[BufferSlot<W>]) -> Option<u8> {
        critical_section::with(|cs| self.free.borrow_ref_mut(cs).pop(slots))
    }

    pub(crate) fn take_free<const W: usize>(
        &self,
        slots: &[BufferSlot<W>],
        event: &dyn WaitEvent,
        block: bool,
    ) -> Option<u8> {
        if block {
            event.assert_can_block();
        }
        loop {
            if let Some(index) = self.pop_free(slots) {
                return Some(index);
            }
            if !block {
                return None;
            }
            event.wait();
        }
    }

    pub(crate) fn give_free<const W: usize>(
        &self,
        slots: &[BufferSlot<W>],
        event: &dyn WaitEvent,
        index: u8,
    ) {
        critical_section::with(|cs| self.free.borrow_ref_mut(cs).push(slots, index));
        event.notify();
    }

    // ── Prepared list ──────────────────────────────────────────────────

    pub(crate) fn pop_prepared<const W: usize>(&self, slots: &[BufferSlot<W>]) -> Option<u8> {
        critical_section::with(|cs| self.prepared.borrow_ref_mut(cs).pop_front(slots))
    }

    pub(crate) fn take_prepared<const W: usize>(
        &self,
        slots: &[BufferSlot<W>],
        event: &dyn WaitEvent,
        block: bool,
    ) -> Option<u8> {
        if block {
            event.assert_can_block();
        }
        loop {
            if let Some(index) = self.pop_prepared(slots) {
                return Some(index);
            }
            if !block {
                return None;
            }
            event.wait();
        }
    }

    pub(crate) fn give_prepared<const W: usize>(
        &self,
        slots: &[BufferSlot<W>],
        event: &dyn WaitEvent,
        index: u8,
    ) {
        critical_section::with(|cs| self.prepared.borrow_ref_mut(cs).push_back(slots, index));
        event.notify();
    }

    /// Visit every queued index, free list first. Runs inside one critical
    /// section so the snapshot is consistent.
    pub(crate) fn for_each_queued<const W: usize>(
        &self,
        slots: &[BufferSlot<W>],
        mut f: impl FnMut(u8, bool),
    ) {
        critical_section::with(|cs| {
            for index in self.free.borrow_ref(cs).iter(slots) {
                f(index, false);
            }
            for index in self.prepared.borrow_ref(cs).iter(slots) {
                f(index, true);
            }
        });
    }
}
