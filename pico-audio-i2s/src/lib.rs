//! # pico-audio-i2s
//!
//! A `no_std`, zero-allocation I2S audio output driver for the RP2040
//! (dual Cortex-M0+) written in pure Rust. The application fills buffers,
//! one PIO state machine serialises them onto three pins, and a pair of
//! chained DMA channels keeps it fed from interrupt context. When the
//! application falls behind, the wire plays silence instead of stalling.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`buffer`] | Static buffer arena, free / prepared lists, owned buffer handles |
//! | Format | [`format`] / [`convert`] | PCM encodings, word packing, width and channel conversion |
//! | Flow | [`stream`] / [`connection`] | Producer and consumer pools joined by a routing policy |
//! | Wire | [`sequencer`] | PIO program, state-machine setup, clock divider |
//! | Driver | [`engine`] | Ping-pong DMA, underrun silence, sample-rate changes |
//! | Callback | [`companion`] | Per-buffer hook, inline or on the second core |
//! | Seams | [`hw`] / [`event`] | Hardware and wake-up traits implemented per board |
//!
//! ## Quick start
//!
//! ```ignore
//! use pico_audio_i2s::*;
//!
//! static ARENA: BufferArena<3, 1152> = BufferArena::new();
//! const OUTPUT: AudioFormat = AudioFormat::stereo(44_100, PcmEncoding::S16);
//!
//! let producer = PoolConfig::new(OUTPUT, 3, 576);
//! let stream = Stream::new(&ARENA, connect_config(&OUTPUT, producer)?, &WfeEvent)?;
//!
//! let mut out = I2sOutput::new(sequencer, dma, DirectCallback::default(), OutputConfig::default());
//! out.setup(OUTPUT, &HardwareConfig::default())?;
//! out.connect(&stream)?;
//! out.set_enabled(true)?;
//!
//! loop {
//!     let mut buf = stream.take(PoolRole::Producer, true).unwrap();
//!     tone.fill(&mut buf);
//!     buf.give();
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `tone` | yes | [`tone::SineTone`] test-signal producer (requires `libm`) |
//! | `cortex-m` | no | `WfeEvent`, a `WFE` / `SEV` based [`WaitEvent`] |
//!
//! ## Audio parameters
//!
//! - **Wire format:** I2S, stereo, MSB first, 8 / 16 / 32 bits per channel
//! - **Producer buffers:** 3 × 576 frames ([`constants::BUFFERS_PER_POOL`])
//! - **Silence transfer:** 256 frames ([`constants::SILENCE_BUFFER_SAMPLE_LENGTH`])
//! - **Bit clock:** 2 sequencer cycles per bit

#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod companion;
pub mod connection;
pub mod constants;
pub mod convert;
pub mod engine;
pub mod error;
pub mod event;
pub mod format;
pub mod hw;
pub mod sequencer;
pub mod stream;

#[cfg(feature = "tone")]
pub mod tone;

#[cfg(test)]
mod testing;


pub use buffer::{AudioBuffer, BufferArena, BufferPool, PoolConfig, PoolRole, SampleBuffer};
pub use companion::{run_companion, CallbackDispatch, CompanionDispatch, CompanionMessage, DirectCallback};
pub use connection::ConnectionKind;
pub use engine::{
    connect_config, connect_extra_config, connect_s8_config, connect_thru_config, ConnectOptions, EngineStats,
    HardwareConfig, I2sOutput, OutputConfig,
};
pub use error::SetupError;
pub use event::WaitEvent;
#[cfg(feature = "cortex-m")]
pub use event::WfeEvent;
pub use format::{AudioFormat, PcmEncoding, SampleLayout, SharedFormat};
pub use hw::{CompanionLink, DmaController, Mailbox, Sequencer};
pub use sequencer::{ClockDivider, DividerMode, I2sProgram, SequencerSetup};
pub use stream::{Census, Stream, StreamConfig};
