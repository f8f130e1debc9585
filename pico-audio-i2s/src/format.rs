//! PCM sample formats and the DMA word layout.
//!
//! Buffers store samples packed MSB-first into `u32` words, in the order the
//! sequencer shifts them onto the wire: frame 0 left, frame 0 right, frame 1
//! left, and so on.
//!
//! | Encoding | Samples per word | Stereo frame layout |
//! |----------|------------------|---------------------|
//! | 8-bit    | 4 | `L0 R0 L1 R1` (bits 31..0) |
//! | 16-bit   | 2 | `L << 16 \| R` |
//! | 32-bit   | 1 | `L`, `R` in consecutive words |

use core::sync::atomic::{AtomicU32, Ordering};

/// PCM sample encoding: signedness × width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmEncoding {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
}

impl PcmEncoding {
    /// Sample width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            PcmEncoding::S8 | PcmEncoding::U8 => 8,
            PcmEncoding::S16 | PcmEncoding::U16 => 16,
            PcmEncoding::S32 | PcmEncoding::U32 => 32,
        }
    }

    /// Sample width in bytes.
    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, PcmEncoding::S8 | PcmEncoding::S16 | PcmEncoding::S32)
    }

    /// Mask selecting the low `bits()` bits of a raw sample.
    pub const fn mask(self) -> u32 {
        match self.bits() {
            32 => u32::MAX,
            b => (1u32 << b) - 1,
        }
    }
}

/// Encoding and channel count: everything that decides how samples are
/// laid out in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub encoding: PcmEncoding,
    pub channels: u8,
}

impl SampleLayout {
    pub const fn new(encoding: PcmEncoding, channels: u8) -> Self {
        SampleLayout { encoding, channels }
    }

    /// Bytes per frame (one sample for every channel).
    pub const fn stride(&self) -> usize {
        self.encoding.bytes() * self.channels as usize
    }

    /// Number of `u32` words needed to hold `frames` frames.
    pub const fn words_for(&self, frames: usize) -> usize {
        (frames * self.stride() + 3) / 4
    }

    /// Largest number of frames that fit in `words` words.
    pub const fn frames_in(&self, words: usize) -> usize {
        words * 4 / self.stride()
    }

    /// Word index and left shift of a sample within the packed storage.
    #[inline]
    pub(crate) fn locate(&self, frame: usize, channel: usize) -> (usize, u32) {
        let bits = self.encoding.bits() as usize;
        let bit = (frame * self.channels as usize + channel) * bits;
        (bit / 32, (32 - bits - bit % 32) as u32)
    }
}

/// A stream's PCM format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    pub encoding: PcmEncoding,
    /// 1 (mono) or 2 (stereo).
    pub channels: u8,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, encoding: PcmEncoding, channels: u8) -> Self {
        AudioFormat {
            sample_rate,
            encoding,
            channels,
        }
    }

    pub const fn stereo(sample_rate: u32, encoding: PcmEncoding) -> Self {
        Self::new(sample_rate, encoding, 2)
    }

    pub const fn mono(sample_rate: u32, encoding: PcmEncoding) -> Self {
        Self::new(sample_rate, encoding, 1)
    }

    pub const fn layout(&self) -> SampleLayout {
        SampleLayout::new(self.encoding, self.channels)
    }

    /// Bytes per frame.
    pub const fn stride(&self) -> usize {
        self.layout().stride()
    }
}

/// A pool's format with a sample rate that can be changed while streaming.
///
/// The application writes the rate; the DMA interrupt reads it before each
/// transfer is armed. Layout fields are fixed at construction.
pub struct SharedFormat {
    sample_rate: AtomicU32,
    layout: SampleLayout,
}

impl SharedFormat {
    pub const fn new(format: AudioFormat) -> Self {
        SharedFormat {
            sample_rate: AtomicU32::new(format.sample_rate),
            layout: format.layout(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    /// Request a new sample rate. It is picked up at the next buffer boundary.
    pub fn set_sample_rate(&self, hz: u32) {
        assert!(hz > 0, "sample rate must be non-zero");
        self.sample_rate.store(hz, Ordering::Release);
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Snapshot of the current format.
    pub fn get(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate(), self.layout.encoding, self.layout.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_widths() {
        assert_eq!(PcmEncoding::S8.bits(), 8);
        assert_eq!(PcmEncoding::U16.bytes(), 2);
        assert_eq!(PcmEncoding::S32.mask(), u32::MAX);
        assert_eq!(PcmEncoding::U8.mask(), 0xFF);
        assert!(PcmEncoding::S16.is_signed());
        assert!(!PcmEncoding::U32.is_signed());
    }

    #[test]
    fn stride_and_words() {
        let s16 = SampleLayout::new(PcmEncoding::S16, 2);
        assert_eq!(s16.stride(), 4);
        assert_eq!(s16.words_for(576), 576);

        let s32 = SampleLayout::new(PcmEncoding::S32, 2);
        assert_eq!(s32.stride(), 8);
        assert_eq!(s32.words_for(512), 1024);
        assert_eq!(s32.frames_in(1024), 512);

        // Odd 8-bit stereo frame count pads the last word.
        let s8 = SampleLayout::new(PcmEncoding::S8, 2);
        assert_eq!(s8.words_for(3), 2);
    }

    #[test]
    fn locate_is_msb_first_left_first() {
        let s16 = SampleLayout::new(PcmEncoding::S16, 2);
        assert_eq!(s16.locate(0, 0), (0, 16));
        assert_eq!(s16.locate(0, 1), (0, 0));
        assert_eq!(s16.locate(1, 0), (1, 16));

        let s8 = SampleLayout::new(PcmEncoding::S8, 2);
        assert_eq!(s8.locate(0, 0), (0, 24));
        assert_eq!(s8.locate(1, 1), (0, 0));
        assert_eq!(s8.locate(2, 0), (1, 24));

        let s32 = SampleLayout::new(PcmEncoding::S32, 2);
        assert_eq!(s32.locate(3, 1), (7, 0));

        let mono16 = SampleLayout::new(PcmEncoding::S16, 1);
        assert_eq!(mono16.locate(3, 0), (1, 0));
    }

    #[test]
    fn shared_format_rate_swap() {
        let f = SharedFormat::new(AudioFormat::stereo(44_100, PcmEncoding::S32));
        assert_eq!(f.sample_rate(), 44_100);
        f.set_sample_rate(48_000);
        assert_eq!(f.get(), AudioFormat::stereo(48_000, PcmEncoding::S32));
        assert_eq!(f.layout(), SampleLayout::new(PcmEncoding::S32, 2));
    }
}
