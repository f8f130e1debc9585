//! A producer pool and a consumer pool joined by a connection.
//!
//! The application talks to the producer end, the output driver to the
//! consumer end. Both ends use the same `take` / `give` pair; the
//! [`ConnectionKind`] decides which lists those calls move buffers between
//! and where format conversion happens.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::buffer::{AudioBuffer, BufferArena, BufferPool, BufferSlot, PoolConfig, PoolRole};
use crate::connection::{Connection, ConnectionKind};
use crate::convert::is_convertible;
use crate::error::SetupError;
use crate::event::WaitEvent;

/// Everything needed to build a [`Stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub producer: PoolConfig,
    /// Consumer pool. Its `buffer_count` is ignored for
    /// [`ConnectionKind::PassThrough`], where producer buffers travel to the
    /// consumer unchanged.
    pub consumer: PoolConfig,
    pub connection: ConnectionKind,
}

/// Snapshot of where every buffer of a stream currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Census {
    pub producer_free: usize,
    pub producer_prepared: usize,
    pub consumer_free: usize,
    pub consumer_prepared: usize,
    /// Held by the connection between conversion calls.
    pub carried: usize,
    /// Held by the application or the driver.
    pub outstanding: usize,
}

pub struct Stream<'a, const WORDS: usize> {
    slots: &'a [BufferSlot<WORDS>],
    claimed: &'a AtomicBool,
    event: &'a dyn WaitEvent,
    producer: BufferPool,
    consumer: BufferPool,
    connection: Connection,
    total: usize,
}

impl<'a, const WORDS: usize> Stream<'a, WORDS> {
    /// Claim `arena` and distribute its buffers: producer buffers first, then
    /// consumer buffers. All start on their pool's free list.
    pub fn new<const N: usize>(
        arena: &'a BufferArena<N, WORDS>,
        config: StreamConfig,
        event: &'a dyn WaitEvent,
    ) -> Result<Self, SetupError> {
        let consumer_count = validate(&config, N, WORDS)?;
        let slots = arena.claim().ok_or(SetupError::ArenaInUse)?;

        let producer = BufferPool::new(PoolRole::Producer, &config.producer);
        let consumer = BufferPool::new(
            PoolRole::Consumer,
            &PoolConfig {
                buffer_count: consumer_count,
                ..config.consumer
            },
        );

        let mut index = 0u8;
        for (pool, pool_config, count) in [
            (&producer, &config.producer, config.producer.buffer_count),
            (&consumer, &config.consumer, consumer_count),
        ] {
            for _ in 0..count {
                let slot = &slots[index as usize];
                slot.next.store(crate::buffer::list::NIL, Ordering::Relaxed);
                slot.queued.store(false, Ordering::Relaxed);
                // SAFETY: the arena was just claimed; nothing else can see it.
                unsafe {
                    slot.buffer_mut()
                        .reset(pool_config.format.layout(), pool_config.samples_per_buffer)
                };
                pool.give_free(slots, event, index);
                index += 1;
            }
        }

        log::debug!(
            "stream: {:?}, {} producer + {} consumer buffers",
            config.connection,
            config.producer.buffer_count,
            consumer_count
        );

        Ok(Stream {
            slots,
            claimed: arena.claimed_flag(),
            event,
            producer,
            consumer,
            connection: Connection::new(config.connection),
            total: index as usize,
        })
    }

    /// The pool the application fills.
    pub fn producer(&self) -> &BufferPool {
        &self.producer
    }

    /// The pool the output drains. Same as the producer's buffers under
    /// [`ConnectionKind::PassThrough`], separate buffers otherwise.
    pub fn consumer(&self) -> &BufferPool {
        &self.consumer
    }

    /// How producer buffers reach the consumer, fixed at construction.
    pub fn connection_kind(&self) -> ConnectionKind {
        self.connection.kind()
    }

    /// Change the producer sample rate. The output picks it up at its next
    /// buffer boundary.
    pub fn set_sample_rate(&self, hz: u32) {
        self.producer.format().set_sample_rate(hz);
    }

    /// Take a buffer from one end.
    ///
    /// Producer end: an empty buffer to fill. Consumer end: the next filled
    /// buffer in give order. With `block == false` returns `None` instead of
    /// waiting. A consumer take on a converting connection may return a
    /// partly filled buffer.
    pub fn take(&self, role: PoolRole, block: bool) -> Option<AudioBuffer<'_, WORDS>> {
        let index = match role {
            PoolRole::Producer => {
                let index = self.connection.producer_take(self, block)?;
                // SAFETY: index was just popped and is held only here.
                let buffer = unsafe { self.slot(index).buffer_mut() };
                buffer.clear_tag();
                buffer.set_sample_count(0);
                index
            }
            PoolRole::Consumer => self.connection.consumer_take(self, block)?,
        };
        Some(AudioBuffer::new(self, index, role))
    }

    /// Give a buffer back to the end it was taken from.
    ///
    /// # Panics
    ///
    /// If the buffer belongs to another stream.
    pub fn give(&self, buffer: AudioBuffer<'_, WORDS>) {
        assert!(
            core::ptr::eq(buffer.stream() as *const _ as *const (), self as *const _ as *const ()),
            "buffer given to a stream it was not taken from"
        );
        let role = buffer.role();
        let index = buffer.into_index();
        match role {
            PoolRole::Producer => self.connection.producer_give(self, index),
            PoolRole::Consumer => self.connection.consumer_give(self, index),
        }
    }

    /// Push audio held mid-conversion through to the consumer.
    ///
    /// Only [`ConnectionKind::ConvertOnGive`] holds back partial output; for
    /// the other kinds this does nothing.
    pub fn flush(&self) {
        self.connection.flush(self);
    }

    /// Count every buffer by location.
    ///
    /// # Panics
    ///
    /// If any buffer is found in two places at once.
    pub fn census(&self) -> Census {
        let mut seen = [false; crate::buffer::list::NIL as usize];
        let mut mark = |index: u8| {
            assert!(!seen[index as usize], "buffer {} owned twice", index);
            seen[index as usize] = true;
        };
        let mut c = Census::default();
        self.producer.for_each_queued(self.slots, |i, prepared| {
            mark(i);
            if prepared {
                c.producer_prepared += 1;
            } else {
                c.producer_free += 1;
            }
        });
        self.consumer.for_each_queued(self.slots, |i, prepared| {
            mark(i);
            if prepared {
                c.consumer_prepared += 1;
            } else {
                c.consumer_free += 1;
            }
        });
        if let Some(i) = self.connection.carried() {
            mark(i);
            c.carried = 1;
        }
        c.outstanding = self.total
            - (c.producer_free + c.producer_prepared + c.consumer_free + c.consumer_prepared + c.carried);
        c
    }

    // ── Crate internals ────────────────────────────────────────────────

    pub(crate) fn slot(&self, index: u8) -> &BufferSlot<WORDS> {
        &self.slots[index as usize]
    }

    pub(crate) fn slots(&self) -> &[BufferSlot<WORDS>] {
        self.slots
    }

    pub(crate) fn event(&self) -> &dyn WaitEvent {
        self.event
    }

    /// Return a buffer that was taken but not used.
    pub(crate) fn discard(&self, index: u8, role: PoolRole) {
        match role {
            PoolRole::Producer => self.producer.give_free(self.slots, self.event, index),
            PoolRole::Consumer => self.connection.consumer_give(self, index),
        }
    }
}

impl<const WORDS: usize> Drop for Stream<'_, WORDS> {
    fn drop(&mut self) {
        self.claimed.store(false, Ordering::Release);
    }
}

/// Check a configuration against the arena. Returns the consumer buffer
/// count actually used.
fn validate(config: &StreamConfig, arena_len: usize, words: usize) -> Result<usize, SetupError> {
    let (p, c) = (&config.producer, &config.consumer);
    for f in [&p.format, &c.format] {
        if !matches!(f.channels, 1 | 2) {
            return Err(SetupError::UnsupportedChannels);
        }
        if f.sample_rate == 0 {
            return Err(SetupError::UnsupportedFormat);
        }
    }
    if !is_convertible(p.format.layout(), c.format.layout()) {
        return Err(SetupError::UnsupportedChannels);
    }

    let consumer_count = match config.connection {
        ConnectionKind::PassThrough => {
            if p.format.layout() != c.format.layout() {
                return Err(SetupError::FormatMismatch);
            }
            0
        }
        ConnectionKind::ConvertOnTake | ConnectionKind::ConvertOnGive => {
            if c.buffer_count == 0 {
                return Err(SetupError::InsufficientBuffers);
            }
            c.buffer_count
        }
    };
    // An empty producer pool is legal: take never succeeds on it.
    if p.buffer_count + consumer_count > arena_len {
        return Err(SetupError::InsufficientBuffers);
    }

    let fits = |pool: &PoolConfig| {
        pool.samples_per_buffer > 0 && pool.format.layout().words_for(pool.samples_per_buffer) <= words
    };
    if !fits(p) || (consumer_count > 0 && !fits(c)) {
        return Err(SetupError::BufferTooSmall);
    }
    Ok(consumer_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioFormat, PcmEncoding};
    use crate::testing::CondvarEvent;

    const S32: AudioFormat = AudioFormat::stereo(44_100, PcmEncoding::S32);
    const S16: AudioFormat = AudioFormat::stereo(44_100, PcmEncoding::S16);

    fn thru(count: usize, samples: usize) -> StreamConfig {
        StreamConfig {
            producer: PoolConfig::new(S32, count, samples),
            consumer: PoolConfig::new(S32, 0, samples),
            connection: ConnectionKind::PassThrough,
        }
    }

    #[test]
    fn new_places_all_buffers_on_free() {
        let arena: BufferArena<3, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let stream = Stream::new(&arena, thru(3, 8), &event).unwrap();
        let c = stream.census();
        assert_eq!(c.producer_free, 3);
        assert_eq!(c.outstanding, 0);
        assert_eq!(stream.producer().buffer_count(), 3);
        assert_eq!(stream.consumer().buffer_count(), 0);
    }

    #[test]
    fn empty_producer_pool_never_yields() {
        let arena: BufferArena<3, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let stream = Stream::new(&arena, thru(0, 8), &event).unwrap();
        assert!(stream.take(PoolRole::Producer, false).is_none());
        assert!(stream.take(PoolRole::Consumer, false).is_none());
        assert_eq!(stream.census().producer_free, 0);
    }

    #[test]
    fn arena_is_exclusive_until_drop() {
        let arena: BufferArena<3, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let first = Stream::new(&arena, thru(2, 8), &event).unwrap();
        assert_eq!(
            Stream::new(&arena, thru(1, 8), &event).err(),
            Some(SetupError::ArenaInUse)
        );
        drop(first);
        assert!(Stream::new(&arena, thru(1, 8), &event).is_ok());
    }

    #[test]
    fn rejects_bad_configs() {
        let arena: BufferArena<3, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let err = |config| Stream::new(&arena, config, &event).err();

        assert_eq!(err(thru(4, 8)), Some(SetupError::InsufficientBuffers));
        assert_eq!(err(thru(2, 9)), Some(SetupError::BufferTooSmall));

        let mut mismatch = thru(2, 8);
        mismatch.consumer.format = S16;
        assert_eq!(err(mismatch), Some(SetupError::FormatMismatch));

        let downmix = StreamConfig {
            producer: PoolConfig::new(S16, 1, 8),
            consumer: PoolConfig::new(AudioFormat::mono(44_100, PcmEncoding::S16), 1, 8),
            connection: ConnectionKind::ConvertOnTake,
        };
        assert_eq!(err(downmix), Some(SetupError::UnsupportedChannels));

        let no_consumer = StreamConfig {
            producer: PoolConfig::new(S16, 1, 8),
            consumer: PoolConfig::new(S32, 0, 8),
            connection: ConnectionKind::ConvertOnGive,
        };
        assert_eq!(err(no_consumer), Some(SetupError::InsufficientBuffers));
        assert!(!arena.is_claimed());
    }

    #[test]
    fn drop_returns_producer_buffer_to_free() {
        let arena: BufferArena<2, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let stream = Stream::new(&arena, thru(2, 8), &event).unwrap();
        let buf = stream.take(PoolRole::Producer, false).unwrap();
        assert_eq!(stream.census().outstanding, 1);
        drop(buf);
        let c = stream.census();
        assert_eq!((c.producer_free, c.consumer_prepared, c.outstanding), (2, 0, 0));
    }

    #[test]
    fn take_clears_previous_contents_metadata() {
        let arena: BufferArena<1, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let stream = Stream::new(&arena, thru(1, 8), &event).unwrap();
        let mut buf = stream.take(PoolRole::Producer, false).unwrap();
        buf.set_tag(7);
        buf.set_sample_count(8);
        drop(buf);
        let buf = stream.take(PoolRole::Producer, false).unwrap();
        assert_eq!((buf.tag(), buf.sample_count()), (0, 0));
        buf.give();
    }

    #[test]
    #[should_panic(expected = "not taken from")]
    fn give_to_foreign_stream_panics() {
        let a: BufferArena<1, 16> = BufferArena::new();
        let b: BufferArena<1, 16> = BufferArena::new();
        let event = CondvarEvent::new();
        let sa = Stream::new(&a, thru(1, 8), &event).unwrap();
        let sb = Stream::new(&b, thru(1, 8), &event).unwrap();
        let buf = sa.take(PoolRole::Producer, false).unwrap();
        sb.give(buf);
    }
}
