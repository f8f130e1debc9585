/// Default number of buffers in a producer pool.
pub const BUFFERS_PER_POOL: usize = 3;

/// Default number of sample frames per producer buffer.
pub const BUFFER_SAMPLE_LENGTH: usize = 576;

/// Default buffer count and length of the consumer pool created by `connect`.
pub const CONSUMER_BUFFER_COUNT: usize = 2;
pub const CONSUMER_BUFFER_SAMPLE_LENGTH: usize = 256;

/// Frames transmitted per underrun (one silence transfer).
pub const SILENCE_BUFFER_SAMPLE_LENGTH: usize = 256;

/// Words in the static silence buffer: enough for 32-bit stereo frames.
pub const SILENCE_BUFFER_WORDS: usize = SILENCE_BUFFER_SAMPLE_LENGTH * 2;

/// Default serial data pin.
pub const DEFAULT_DATA_PIN: u8 = 18;

/// Default bit clock pin. The frame clock is on the following pin.
pub const DEFAULT_CLOCK_PIN_BASE: u8 = 16;

/// Default ping-pong DMA channel pair.
pub const DEFAULT_DMA_CHANNELS: [u8; 2] = [0, 1];

/// Default sequencer state machine.
pub const DEFAULT_STATE_MACHINE: u8 = 0;

/// Number of state machines per sequencer block.
pub const STATE_MACHINE_COUNT: u8 = 4;

/// Number of DMA channels on the controller.
pub const DMA_CHANNEL_COUNT: u8 = 12;

/// Highest usable GPIO number.
pub const MAX_PIN: u8 = 29;

/// Bound on every cross-core handshake, in microseconds.
pub const HANDSHAKE_TIMEOUT_US: u32 = 10_000;

/// Default system clock used for divider computation.
pub const DEFAULT_SYSTEM_CLOCK_HZ: u32 = 125_000_000;
