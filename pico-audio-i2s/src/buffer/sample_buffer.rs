use crate::convert::{from_s32, to_s32};
use crate::format::{PcmEncoding, SampleLayout};

/// Fixed-capacity block of interleaved PCM frames.
///
/// Storage is `WORDS` 32-bit words in the DMA layout described in
/// [`format`](crate::format). `max_sample_count` is fixed by the owning pool;
/// `sample_count` is set by whoever fills the buffer.
pub struct SampleBuffer<const WORDS: usize> {
    words: [u32; WORDS],
    layout: SampleLayout,
    max_sample_count: usize,
    sample_count: usize,
    tag: u32,
}

impl<const WORDS: usize> SampleBuffer<WORDS> {
    /// Create an empty, zeroed buffer.
    ///
    /// # Panics
    ///
    /// If `max_sample_count` frames of `layout` do not fit in `WORDS` words.
    pub fn new(layout: SampleLayout, max_sample_count: usize) -> Self {
        assert!(
            layout.words_for(max_sample_count) <= WORDS,
            "buffer too small for {} frames",
            max_sample_count
        );
        SampleBuffer {
            words: [0; WORDS],
            layout,
            max_sample_count,
            sample_count: 0,
            tag: 0,
        }
    }

    pub(crate) const fn empty() -> Self {
        SampleBuffer {
            words: [0; WORDS],
            layout: SampleLayout::new(PcmEncoding::S16, 2),
            max_sample_count: 0,
            sample_count: 0,
            tag: 0,
        }
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Capacity in frames.
    pub fn max_sample_count(&self) -> usize {
        self.max_sample_count
    }

    /// Number of valid frames.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Mark the first `count` frames valid. When they end part-way through
    /// a word, the rest of that word is zeroed so the padding DMA sends is
    /// silence rather than an earlier fill.
    ///
    /// # Panics
    ///
    /// If `count` exceeds `max_sample_count()`.
    pub fn set_sample_count(&mut self, count: usize) {
        assert!(count <= self.max_sample_count, "sample count {} over capacity", count);
        self.sample_count = count;
        let bit = count * self.layout.channels as usize * self.layout.encoding.bits() as usize;
        let used = (bit % 32) as u32;
        if used != 0 {
            self.words[bit / 32] &= !(u32::MAX >> used);
        }
    }

    /// Opaque application tag. Cleared when the producer takes the buffer.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn set_tag(&mut self, tag: u32) {
        self.tag = tag;
    }

    pub(crate) fn clear_tag(&mut self) {
        self.tag = 0;
    }

    /// Raw storage words.
    pub fn words(&self) -> &[u32; WORDS] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u32; WORDS] {
        &mut self.words
    }

    /// The words covering the valid frames: what DMA transmits.
    pub fn valid_words(&self) -> &[u32] {
        &self.words[..self.layout.words_for(self.sample_count)]
    }

    /// Raw bits of one sample (`encoding.bits()` wide).
    #[inline]
    pub fn read_raw(&self, frame: usize, channel: usize) -> u32 {
        let (word, shift) = self.layout.locate(frame, channel);
        (self.words[word] >> shift) & self.layout.encoding.mask()
    }

    #[inline]
    pub fn write_raw(&mut self, frame: usize, channel: usize, raw: u32) {
        let mask = self.layout.encoding.mask();
        let (word, shift) = self.layout.locate(frame, channel);
        let w = &mut self.words[word];
        *w = (*w & !(mask << shift)) | ((raw & mask) << shift);
    }

    /// Sample as signed 32-bit full scale, whatever the encoding.
    pub fn read_s32(&self, frame: usize, channel: usize) -> i32 {
        to_s32(self.read_raw(frame, channel), self.layout.encoding)
    }

    /// Store a signed 32-bit full-scale sample, truncated to the encoding.
    pub fn write_s32(&mut self, frame: usize, channel: usize, value: i32) {
        self.write_raw(frame, channel, from_s32(value, self.layout.encoding));
    }

    /// Fill every frame with the encoding's zero level and mark the buffer full.
    pub fn fill_silence(&mut self) {
        let zero = from_s32(0, self.layout.encoding);
        if zero == 0 {
            self.words.fill(0);
        } else {
            for frame in 0..self.max_sample_count {
                for ch in 0..self.layout.channels as usize {
                    self.write_raw(frame, ch, zero);
                }
            }
        }
        self.sample_count = self.max_sample_count;
    }

    pub(crate) fn reset(&mut self, layout: SampleLayout, max_sample_count: usize) {
        *self = SampleBuffer::new(layout, max_sample_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty_and_zeroed() {
        let b: SampleBuffer<8> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S16, 2), 8);
        assert_eq!(b.sample_count(), 0);
        assert_eq!(b.max_sample_count(), 8);
        assert!(b.words().iter().all(|&w| w == 0));
        assert!(b.valid_words().is_empty());
    }

    #[test]
    #[should_panic]
    fn new_rejects_oversized() {
        let _b: SampleBuffer<8> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S32, 2), 5);
    }

    #[test]
    fn raw_roundtrip_preserves_neighbours() {
        let mut b: SampleBuffer<4> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S8, 2), 8);
        b.write_raw(0, 0, 0x11);
        b.write_raw(0, 1, 0x22);
        b.write_raw(1, 0, 0x33);
        b.write_raw(1, 1, 0x44);
        assert_eq!(b.words()[0], 0x1122_3344);
        b.write_raw(0, 1, 0xFF);
        assert_eq!(b.words()[0], 0x11FF_3344);
        assert_eq!(b.read_raw(1, 0), 0x33);
    }

    #[test]
    fn s32_accessors_scale() {
        let mut b: SampleBuffer<4> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S16, 2), 4);
        b.write_s32(0, 0, -1 << 16);
        assert_eq!(b.read_raw(0, 0), 0xFFFF);
        assert_eq!(b.read_s32(0, 0), -1 << 16);
    }

    #[test]
    fn valid_words_tracks_sample_count() {
        let mut b: SampleBuffer<16> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S32, 2), 8);
        b.set_sample_count(3);
        assert_eq!(b.valid_words().len(), 6);
    }

    #[test]
    fn partial_word_tail_is_zeroed() {
        let mut b: SampleBuffer<4> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S8, 2), 8);
        for f in 0..4 {
            b.write_raw(f, 0, 0x55);
            b.write_raw(f, 1, 0x55);
        }
        b.set_sample_count(4);
        assert_eq!(b.valid_words(), &[0x5555_5555, 0x5555_5555]);

        // Refill with one frame fewer; the old fourth frame must not survive.
        for f in 0..3 {
            b.write_raw(f, 0, 0x11);
            b.write_raw(f, 1, 0x11);
        }
        b.set_sample_count(3);
        assert_eq!(b.valid_words(), &[0x1111_1111, 0x1111_0000]);
    }

    #[test]
    fn mono_16_bit_odd_count_pads_with_zero() {
        let mut b: SampleBuffer<2> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S16, 1), 4);
        b.words_mut().fill(0xDEAD_BEEF);
        b.set_sample_count(1);
        assert_eq!(b.valid_words(), &[0xDEAD_0000]);
        b.set_sample_count(2);
        assert_eq!(b.valid_words(), &[0xDEAD_0000]);
    }

    #[test]
    #[should_panic]
    fn sample_count_over_capacity_panics() {
        let mut b: SampleBuffer<4> = SampleBuffer::new(SampleLayout::new(PcmEncoding::S16, 2), 4);
        b.set_sample_count(5);
    }

    #[test]
    fn silence_for_unsigned_is_midscale() {
        let mut b: SampleBuffer<2> = SampleBuffer::new(SampleLayout::new(PcmEncoding::U16, 2), 2);
        b.fill_silence();
        assert_eq!(b.sample_count(), 2);
        assert_eq!(b.words(), &[0x8000_8000, 0x8000_8000]);
    }
}
