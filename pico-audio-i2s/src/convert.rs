//! Sample conversion between PCM layouts.
//!
//! Every sample passes through a signed, left-aligned 32-bit intermediate:
//! widening is a left shift, narrowing an arithmetic right shift, and
//! unsigned encodings flip the sign bit. Widening then narrowing back is
//! therefore lossless.
//!
//! Channel conversion only goes up: a mono source is duplicated into every
//! destination channel. Down-mixing is not supported.

use crate::buffer::SampleBuffer;
use crate::format::{PcmEncoding, SampleLayout};

/// Expand a raw sample (low `bits()` bits of `raw`) to signed 32-bit full scale.
#[inline]
pub fn to_s32(raw: u32, encoding: PcmEncoding) -> i32 {
    match encoding {
        PcmEncoding::S8 => ((raw as u8 as i8) as i32) << 24,
        PcmEncoding::U8 => (((raw as u8) ^ 0x80) as i8 as i32) << 24,
        PcmEncoding::S16 => ((raw as u16 as i16) as i32) << 16,
        PcmEncoding::U16 => (((raw as u16) ^ 0x8000) as i16 as i32) << 16,
        PcmEncoding::S32 => raw as i32,
        PcmEncoding::U32 => (raw ^ 0x8000_0000) as i32,
    }
}

/// Reduce a signed 32-bit full-scale sample to the raw bits of `encoding`.
#[inline]
pub fn from_s32(value: i32, encoding: PcmEncoding) -> u32 {
    match encoding {
        PcmEncoding::S8 => ((value >> 24) as u8) as u32,
        PcmEncoding::U8 => (((value >> 24) as u8) ^ 0x80) as u32,
        PcmEncoding::S16 => ((value >> 16) as u16) as u32,
        PcmEncoding::U16 => (((value >> 16) as u16) ^ 0x8000) as u32,
        PcmEncoding::S32 => value as u32,
        PcmEncoding::U32 => (value as u32) ^ 0x8000_0000,
    }
}

/// Whether `from` can be converted into `to` by [`copy_frames`].
pub fn is_convertible(from: SampleLayout, to: SampleLayout) -> bool {
    matches!(from.channels, 1 | 2) && matches!(to.channels, 1 | 2) && from.channels <= to.channels
}

/// Copy `frames` frames from `src[src_pos..]` into `dst[dst_pos..]`,
/// converting between the two buffers' layouts.
///
/// # Panics
///
/// If either range exceeds its buffer's `max_sample_count`, or the layouts
/// are not convertible.
pub fn copy_frames<const WORDS: usize>(
    dst: &mut SampleBuffer<WORDS>,
    dst_pos: usize,
    src: &SampleBuffer<WORDS>,
    src_pos: usize,
    frames: usize,
) {
    let from = src.layout();
    let to = dst.layout();
    assert!(is_convertible(from, to), "cannot convert {:?} into {:?}", from, to);
    assert!(src_pos + frames <= src.max_sample_count());
    assert!(dst_pos + frames <= dst.max_sample_count());

    if from == to && from.encoding.bits() == 32 {
        // Whole words line up: plain copy.
        let per_frame = from.channels as usize;
        dst.words_mut()[dst_pos * per_frame..(dst_pos + frames) * per_frame]
            .copy_from_slice(&src.words()[src_pos * per_frame..(src_pos + frames) * per_frame]);
        return;
    }

    for i in 0..frames {
        for ch in 0..to.channels as usize {
            let src_ch = if from.channels == 1 { 0 } else { ch };
            let raw = src.read_raw(src_pos + i, src_ch);
            let value = if from.encoding == to.encoding {
                raw
            } else {
                from_s32(to_s32(raw, from.encoding), to.encoding)
            };
            dst.write_raw(dst_pos + i, ch, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::AudioFormat;

    const WORDS: usize = 16;

    fn buffer(encoding: PcmEncoding, channels: u8) -> SampleBuffer<WORDS> {
        let layout = SampleLayout::new(encoding, channels);
        SampleBuffer::new(layout, layout.frames_in(WORDS))
    }

    #[test]
    fn widen_then_narrow_is_lossless() {
        for v in [i16::MIN, -12345, -1, 0, 1, 440, i16::MAX] {
            let wide = to_s32(v as u16 as u32, PcmEncoding::S16);
            assert_eq!(wide, (v as i32) << 16);
            let back = from_s32(wide, PcmEncoding::S16);
            assert_eq!(back as u16 as i16, v);
        }
    }

    #[test]
    fn unsigned_flips_sign_bit() {
        assert_eq!(to_s32(0x8000, PcmEncoding::U16), 0);
        assert_eq!(to_s32(0x0000, PcmEncoding::U16), i16::MIN as i32 * 65536);
        assert_eq!(to_s32(0x80, PcmEncoding::U8), 0);
        assert_eq!(from_s32(0, PcmEncoding::U32), 0x8000_0000);
        assert_eq!(from_s32(i32::MAX, PcmEncoding::U8), 0xFF);
    }

    #[test]
    fn s8_widens_to_s16() {
        assert_eq!(from_s32(to_s32(0x7F, PcmEncoding::S8), PcmEncoding::S16), 0x7F00);
        assert_eq!(from_s32(to_s32(0x80, PcmEncoding::S8), PcmEncoding::S16), 0x8000);
    }

    #[test]
    fn convertibility() {
        let m = SampleLayout::new(PcmEncoding::S16, 1);
        let s = SampleLayout::new(PcmEncoding::S32, 2);
        assert!(is_convertible(m, s));
        assert!(!is_convertible(s, m));
        assert!(is_convertible(AudioFormat::stereo(1, PcmEncoding::U8).layout(), s));
    }

    #[test]
    fn copy_widens_stereo_16_to_32() {
        let mut src = buffer(PcmEncoding::S16, 2);
        let mut dst = buffer(PcmEncoding::S32, 2);
        for f in 0..4 {
            src.write_raw(f, 0, (100 * f as i16) as u16 as u32);
            src.write_raw(f, 1, (-100 * f as i16) as u16 as u32);
        }
        copy_frames(&mut dst, 0, &src, 0, 4);
        for f in 0..4 {
            assert_eq!(dst.read_raw(f, 0) as i32, (100 * f as i32) << 16);
            assert_eq!(dst.read_raw(f, 1) as i32, (-100 * f as i32) << 16);
        }
    }

    #[test]
    fn copy_duplicates_mono_into_stereo() {
        let mut src = buffer(PcmEncoding::S16, 1);
        let mut dst = buffer(PcmEncoding::S16, 2);
        src.write_raw(0, 0, 0x1234);
        src.write_raw(1, 0, 0xFEDC);
        copy_frames(&mut dst, 2, &src, 0, 2);
        assert_eq!(dst.words()[2], 0x1234_1234);
        assert_eq!(dst.words()[3], 0xFEDC_FEDC);
    }

    #[test]
    fn copy_32_bit_same_layout_is_word_copy() {
        let mut src = buffer(PcmEncoding::S32, 2);
        let mut dst = buffer(PcmEncoding::S32, 2);
        for (i, w) in src.words_mut().iter_mut().enumerate() {
            *w = i as u32 * 3;
        }
        copy_frames(&mut dst, 1, &src, 2, 3);
        assert_eq!(&dst.words()[2..8], &src.words()[4..10]);
        assert_eq!(dst.words()[0], 0);
    }

    #[test]
    #[should_panic]
    fn copy_rejects_downmix() {
        let src = buffer(PcmEncoding::S16, 2);
        let mut dst = buffer(PcmEncoding::S16, 1);
        copy_frames(&mut dst, 0, &src, 0, 1);
    }
}
