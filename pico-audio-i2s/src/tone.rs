//! Sine test-signal producer.
//!
//! Phase accumulator over a 257-entry wavetable with linear interpolation
//! between adjacent entries. The table is built once with `libm::sinf`.

use crate::buffer::SampleBuffer;

const TABLE_LEN: usize = 256;

/// Sine oscillator that fills whole buffers.
///
/// # Example
/// ```ignore
/// let mut tone = SineTone::new(440.0, 44_100, 0.5);
/// let mut buf = stream.take(PoolRole::Producer, true).unwrap();
/// tone.fill(&mut buf);
/// buf.give();
/// ```
pub struct SineTone {
    table: [i16; TABLE_LEN + 1],
    /// Phase accumulator (wraps naturally at 32 bits = 360°).
    phase: u32,
    /// `hz / sample_rate * 2^32`.
    increment: u32,
    frequency: f32,
    sample_rate: u32,
    /// Q16.16. 65536 = full scale.
    magnitude: i32,
}

impl SineTone {
    pub fn new(frequency: f32, sample_rate: u32, amplitude: f32) -> Self {
        let mut table = [0i16; TABLE_LEN + 1];
        for (i, entry) in table.iter_mut().enumerate() {
            let angle = i as f32 * (2.0 * core::f32::consts::PI / TABLE_LEN as f32);
            *entry = (libm::sinf(angle) * i16::MAX as f32) as i16;
        }
        let mut tone = SineTone {
            table,
            phase: 0,
            increment: 0,
            frequency,
            sample_rate,
            magnitude: 0,
        };
        tone.set_amplitude(amplitude);
        tone.update_increment();
        tone
    }

    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = hz;
        self.update_increment();
    }

    /// Keep the pitch when the stream rate changes.
    pub fn set_sample_rate(&mut self, hz: u32) {
        self.sample_rate = hz;
        self.update_increment();
    }

    /// 0.0 = silent, 1.0 = full scale.
    pub fn set_amplitude(&mut self, level: f32) {
        let clamped = level.clamp(0.0, 1.0);
        self.magnitude = (clamped * 65536.0) as i32;
    }

    fn update_increment(&mut self) {
        let inc = self.frequency * (4_294_967_296.0 / self.sample_rate as f32);
        self.increment = inc as u32;
    }

    /// Next sample at signed 32-bit full scale.
    #[inline]
    pub fn next_sample(&mut self) -> i32 {
        let index = (self.phase >> 24) as usize;
        let v1 = self.table[index] as i32;
        let v2 = self.table[index + 1] as i32;
        let scale = ((self.phase >> 8) & 0xFFFF) as i32;
        let interpolated = v1 * (0x10000 - scale) + v2 * scale;
        self.phase = self.phase.wrapping_add(self.increment);
        ((interpolated as i64 * self.magnitude as i64) >> 16) as i32
    }

    /// Fill every frame of `buffer` (all channels get the same sample) and
    /// mark it full.
    pub fn fill<const WORDS: usize>(&mut self, buffer: &mut SampleBuffer<WORDS>) {
        let channels = buffer.layout().channels as usize;
        let frames = buffer.max_sample_count();
        for frame in 0..frames {
            let s = self.next_sample();
            for ch in 0..channels {
                buffer.write_s32(frame, ch, s);
            }
        }
        buffer.set_sample_count(frames);
    }
}
