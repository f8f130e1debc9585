//! Routing between the two pools of a [`Stream`](crate::Stream).
//!
//! | Kind | producer take | producer give | consumer take | consumer give |
//! |------|---------------|---------------|---------------|---------------|
//! | `PassThrough` | producer free | consumer prepared | consumer prepared | producer free |
//! | `ConvertOnTake` | producer free | producer prepared | convert into a consumer free buffer | consumer free |
//! | `ConvertOnGive` | producer free | convert into consumer free buffers | consumer prepared | consumer free |
//!
//! Converting connections may hold one buffer between calls: the producer
//! buffer being drained (`ConvertOnTake`) or the consumer buffer being filled
//! (`ConvertOnGive`). Each carry is touched by one end only.

use core::cell::Cell;

use critical_section::Mutex;

use crate::convert::copy_frames;
use crate::stream::Stream;

/// How buffers move from producer to consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Formats match; producer buffers are played as they are.
    PassThrough,
    /// Convert on the consumer's schedule, typically inside the DMA interrupt.
    ConvertOnTake,
    /// Convert when the producer gives; the consumer only dequeues.
    ConvertOnGive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Carry {
    index: u8,
    /// Frames of the carried buffer already consumed (or filled).
    pos: usize,
}

pub(crate) struct Connection {
    kind: ConnectionKind,
    carry: Mutex<Cell<Option<Carry>>>,
}

impl Connection {
    pub fn new(kind: ConnectionKind) -> Self {
        Connection {
            kind,
            carry: Mutex::new(Cell::new(None)),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn carried(&self) -> Option<u8> {
        critical_section::with(|cs| self.carry.borrow(cs).get()).map(|c| c.index)
    }

    fn take_carry(&self) -> Option<Carry> {
        critical_section::with(|cs| self.carry.borrow(cs).take())
    }

    fn put_carry(&self, carry: Option<Carry>) {
        critical_section::with(|cs| self.carry.borrow(cs).set(carry));
    }

    // ── Producer end ───────────────────────────────────────────────────

    pub fn producer_take<const W: usize>(&self, s: &Stream<'_, W>, block: bool) -> Option<u8> {
        s.producer().take_free(s.slots(), s.event(), block)
    }

    pub fn producer_give<const W: usize>(&self, s: &Stream<'_, W>, index: u8) {
        match self.kind {
            ConnectionKind::PassThrough => s.consumer().give_prepared(s.slots(), s.event(), index),
            ConnectionKind::ConvertOnTake => s.producer().give_prepared(s.slots(), s.event(), index),
            ConnectionKind::ConvertOnGive => self.convert_on_give(s, index),
        }
    }

    // ── Consumer end ───────────────────────────────────────────────────

    pub fn consumer_take<const W: usize>(&self, s: &Stream<'_, W>, block: bool) -> Option<u8> {
        match self.kind {
            ConnectionKind::PassThrough | ConnectionKind::ConvertOnGive => {
                s.consumer().take_prepared(s.slots(), s.event(), block)
            }
            ConnectionKind::ConvertOnTake => self.convert_on_take(s, block),
        }
    }

    pub fn consumer_give<const W: usize>(&self, s: &Stream<'_, W>, index: u8) {
        match self.kind {
            ConnectionKind::PassThrough => s.producer().give_free(s.slots(), s.event(), index),
            ConnectionKind::ConvertOnTake | ConnectionKind::ConvertOnGive => {
                s.consumer().give_free(s.slots(), s.event(), index)
            }
        }
    }

    pub fn flush<const W: usize>(&self, s: &Stream<'_, W>) {
        if self.kind != ConnectionKind::ConvertOnGive {
            return;
        }
        if let Some(carry) = self.take_carry() {
            // SAFETY: the carry slot is held by the connection alone.
            unsafe { s.slot(carry.index).buffer_mut() }.set_sample_count(carry.pos);
            s.consumer().give_prepared(s.slots(), s.event(), carry.index);
        }
    }

    // ── Conversion ─────────────────────────────────────────────────────

    /// Fill one consumer buffer from as many prepared producer buffers as it
    /// takes. Only the first wait may block; once audio has been copied a
    /// short buffer is returned rather than stalling the consumer.
    fn convert_on_take<const W: usize>(&self, s: &Stream<'_, W>, block: bool) -> Option<u8> {
        let dst_index = s.consumer().take_free(s.slots(), s.event(), block)?;
        // SAFETY: dst_index was just popped from the free list.
        let dst = unsafe { s.slot(dst_index).buffer_mut() };
        let capacity = dst.max_sample_count();
        let mut pos = 0;
        let mut carry = self.take_carry();

        while pos < capacity {
            let cur = match carry {
                Some(c) => c,
                None => match s.producer().take_prepared(s.slots(), s.event(), block && pos == 0) {
                    Some(index) => Carry { index, pos: 0 },
                    None => break,
                },
            };
            // SAFETY: cur.index is held by this call via the carry.
            let src = unsafe { s.slot(cur.index).buffer() };
            let n = (capacity - pos).min(src.sample_count() - cur.pos);
            copy_frames(dst, pos, src, cur.pos, n);
            pos += n;
            if cur.pos + n >= src.sample_count() {
                s.producer().give_free(s.slots(), s.event(), cur.index);
                carry = None;
            } else {
                carry = Some(Carry {
                    index: cur.index,
                    pos: cur.pos + n,
                });
            }
        }
        self.put_carry(carry);

        if pos == 0 {
            s.consumer().give_free(s.slots(), s.event(), dst_index);
            return None;
        }
        dst.set_sample_count(pos);
        Some(dst_index)
    }

    /// Spread one producer buffer over consumer buffers, queueing each as it
    /// fills, then recycle the producer buffer. Blocks while the consumer has
    /// no free buffer.
    fn convert_on_give<const W: usize>(&self, s: &Stream<'_, W>, src_index: u8) {
        // SAFETY: src_index was handed over by the give.
        let src = unsafe { s.slot(src_index).buffer() };
        let count = src.sample_count();
        let mut pos = 0;
        let mut carry = self.take_carry();

        while pos < count {
            let cur = match carry {
                Some(c) => c,
                None => match s.consumer().take_free(s.slots(), s.event(), true) {
                    Some(index) => {
                        // SAFETY: just popped from the free list.
                        unsafe { s.slot(index).buffer_mut() }.clear_tag();
                        Carry { index, pos: 0 }
                    }
                    None => break,
                },
            };
            // SAFETY: cur.index is held by this call via the carry.
            let dst = unsafe { s.slot(cur.index).buffer_mut() };
            let capacity = dst.max_sample_count();
            let n = (count - pos).min(capacity - cur.pos);
            copy_frames(dst, cur.pos, src, pos, n);
            pos += n;
            if cur.pos + n == capacity {
                dst.set_sample_count(capacity);
                s.consumer().give_prepared(s.slots(), s.event(), cur.index);
                carry = None;
            } else {
                carry = Some(Carry {
                    index: cur.index,
                    pos: cur.pos + n,
                });
            }
        }
        self.put_carry(carry);
        s.producer().give_free(s.slots(), s.event(), src_index);
    }
}
