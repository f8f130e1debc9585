use core::mem;
use core::ops::{Deref, DerefMut};

use super::{PoolRole, SampleBuffer};
use crate::stream::Stream;

/// Exclusive ownership of one buffer taken from a stream.
///
/// Give it back with [`give`](AudioBuffer::give) (or [`Stream::give`]).
/// Dropping it instead returns it to the free side it came from without
/// playing it.
#[must_use = "a taken buffer must be given back to its stream"]
pub struct AudioBuffer<'s, const WORDS: usize> {
    stream: &'s Stream<'s, WORDS>,
    index: u8,
    role: PoolRole,
}

impl<'s, const WORDS: usize> AudioBuffer<'s, WORDS> {
    pub(crate) fn new(stream: &'s Stream<'s, WORDS>, index: u8, role: PoolRole) -> Self {
        AudioBuffer {
            stream,
            index,
            role,
        }
    }

    /// Arena slot index.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// The end of the stream this buffer was taken from.
    pub fn role(&self) -> PoolRole {
        self.role
    }

    pub(crate) fn stream(&self) -> &'s Stream<'s, WORDS> {
        self.stream
    }

    /// Hand the buffer back to its stream.
    pub fn give(self) {
        self.stream.give(self);
    }

    /// Release ownership without returning the buffer anywhere.
    pub(crate) fn into_index(self) -> u8 {
        let index = self.index;
        mem::forget(self);
        index
    }
}

impl<const WORDS: usize> Deref for AudioBuffer<'_, WORDS> {
    type Target = SampleBuffer<WORDS>;

    fn deref(&self) -> &SampleBuffer<WORDS> {
        // SAFETY: this guard is the only holder of `index`.
        unsafe { self.stream.slot(self.index).buffer() }
    }
}

impl<const WORDS: usize> DerefMut for AudioBuffer<'_, WORDS> {
    fn deref_mut(&mut self) -> &mut SampleBuffer<WORDS> {
        // SAFETY: this guard is the only holder of `index`, borrowed mutably.
        unsafe { self.stream.slot(self.index).buffer_mut() }
    }
}

impl<const WORDS: usize> Drop for AudioBuffer<'_, WORDS> {
    fn drop(&mut self) {
        self.stream.discard(self.index, self.role);
    }
}

impl<const WORDS: usize> core::fmt::Debug for AudioBuffer<'_, WORDS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("index", &self.index)
            .field("role", &self.role)
            .field("sample_count", &self.sample_count())
            .finish()
    }
}
