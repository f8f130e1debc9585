//! DMA ping-pong I2S output.
//!
//! [`I2sOutput`] owns the sequencer, the DMA controller and the callback
//! dispatch, and drains the consumer end of one [`Stream`] into the
//! sequencer's TX FIFO forever.
//!
//! ## Architecture
//!
//! ```text
//!  Stream (consumer end)          DMA A ◄──chain──► DMA B            Sequencer
//! ┌──────────────────────┐      ┌─────────┐        ┌─────────┐      ┌──────────┐
//! │ prepared: B3 B4 ...  ├─take─► playing ├────────► playing ├──────► TX FIFO  │──► wire
//! └──────────▲───────────┘      └────┬────┘        └────┬────┘      └──────────┘
//!            └────────── give ───────┴── on completion ─┘
//! ```
//!
//! The two channels are chained to each other, so when one finishes the
//! other is already running. The completion interrupt for a channel
//! recycles the buffer it played, re-arms it with the next prepared buffer
//! (or static silence when there is none) and fires the callback.
//!
//! ## Sample-rate changes
//!
//! The producer's sample rate is read at every arm step. A change computes
//! the new divider once and parks it with the channel just armed; it is
//! written to the sequencer when that channel starts, which is the next
//! completion of the other channel. The rate therefore switches exactly at
//! the buffer boundary.
//!
//! ## Usage
//!
//! ```ignore
//! let stream = Stream::new(&ARENA, connect_config(&OUTPUT, producer)?, &WfeEvent)?;
//! let mut out = I2sOutput::new(seq, dma, DirectCallback(refill), OutputConfig::default());
//! out.setup(OUTPUT, &HardwareConfig::default())?;
//! out.connect(&stream)?;
//! out.set_enabled(true)?;
//!
//! // DMA_IRQ_0:
//! out.on_dma_irq();
//! ```

use crate::buffer::{AudioBuffer, PoolConfig, PoolRole};
use crate::companion::{CallbackDispatch, DirectCallback};
use crate::connection::ConnectionKind;
use crate::constants::{
    CONSUMER_BUFFER_COUNT, CONSUMER_BUFFER_SAMPLE_LENGTH, DEFAULT_CLOCK_PIN_BASE, DEFAULT_DATA_PIN,
    DEFAULT_DMA_CHANNELS, DEFAULT_STATE_MACHINE, DEFAULT_SYSTEM_CLOCK_HZ, DMA_CHANNEL_COUNT, MAX_PIN,
    SILENCE_BUFFER_SAMPLE_LENGTH, SILENCE_BUFFER_WORDS, STATE_MACHINE_COUNT,
};
use crate::error::SetupError;
use crate::format::{AudioFormat, PcmEncoding};
use crate::hw::{DmaController, Sequencer};
use crate::sequencer::{ClockDivider, DividerMode, I2sProgram, SequencerSetup};
use crate::stream::{Stream, StreamConfig};

/// Transmitted whenever no prepared buffer is available.
static SILENCE: [u32; SILENCE_BUFFER_WORDS] = [0; SILENCE_BUFFER_WORDS];

// ── Configuration ──────────────────────────────────────────────────────

/// Pins and hardware resources. Must not alias resources used elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareConfig {
    pub data_pin: u8,
    /// BCLK; LRCLK is `clock_pin_base + 1`.
    pub clock_pin_base: u8,
    /// Ping-pong pair, A then B.
    pub dma_channels: [u8; 2],
    pub state_machine: u8,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            data_pin: DEFAULT_DATA_PIN,
            clock_pin_base: DEFAULT_CLOCK_PIN_BASE,
            dma_channels: DEFAULT_DMA_CHANNELS,
            state_machine: DEFAULT_STATE_MACHINE,
        }
    }
}

impl HardwareConfig {
    /// Check pins, DMA channels and state machine against the RP2040's
    /// resources.
    ///
    /// # Errors
    ///
    /// - [`SetupError::PinConflict`] if a pin is out of range or the data
    ///   pin overlaps the clock pair
    /// - [`SetupError::DmaChannelConflict`] if the two channels are equal or
    ///   out of range
    /// - [`SetupError::InvalidStateMachine`] if the state machine index is
    ///   not 0..=3
    pub fn validate(&self) -> Result<(), SetupError> {
        let lrclk = self.clock_pin_base as u16 + 1;
        if self.data_pin > MAX_PIN
            || lrclk > MAX_PIN as u16
            || self.data_pin == self.clock_pin_base
            || self.data_pin as u16 == lrclk
        {
            return Err(SetupError::PinConflict);
        }
        let [a, b] = self.dma_channels;
        if a == b || a >= DMA_CHANNEL_COUNT || b >= DMA_CHANNEL_COUNT {
            return Err(SetupError::DmaChannelConflict);
        }
        if self.state_machine >= STATE_MACHINE_COUNT {
            return Err(SetupError::InvalidStateMachine);
        }
        Ok(())
    }
}

/// Clocking options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub system_clock_hz: u32,
    pub divider_mode: DividerMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            system_clock_hz: DEFAULT_SYSTEM_CLOCK_HZ,
            divider_mode: DividerMode::Fractional,
        }
    }
}

/// Consumer-side options for [`connect_extra_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Convert when the producer gives instead of inside the interrupt.
    pub buffer_on_give: bool,
    pub buffer_count: usize,
    pub samples_per_buffer: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            buffer_on_give: false,
            buffer_count: CONSUMER_BUFFER_COUNT,
            samples_per_buffer: CONSUMER_BUFFER_SAMPLE_LENGTH,
        }
    }
}

// ── Connection planning ────────────────────────────────────────────────

/// Stream layout for feeding `output` from `producer`: pass-through when the
/// layouts match, convert-on-take otherwise.
pub fn connect_config(output: &AudioFormat, producer: PoolConfig) -> Result<StreamConfig, SetupError> {
    connect_extra_config(output, producer, ConnectOptions::default())
}

/// Pass-through only.
pub fn connect_thru_config(output: &AudioFormat, producer: PoolConfig) -> Result<StreamConfig, SetupError> {
    if producer.format.layout() != output.layout() {
        return Err(SetupError::FormatMismatch);
    }
    connect_config(output, producer)
}

/// 8-bit mono or stereo producer, widened to the output format.
pub fn connect_s8_config(output: &AudioFormat, producer: PoolConfig) -> Result<StreamConfig, SetupError> {
    if producer.format.encoding.bits() != 8 {
        return Err(SetupError::UnsupportedFormat);
    }
    connect_config(output, producer)
}

/// Full control over the consumer pool of a converting connection.
pub fn connect_extra_config(
    output: &AudioFormat,
    producer: PoolConfig,
    options: ConnectOptions,
) -> Result<StreamConfig, SetupError> {
    if producer.format.channels > output.channels {
        return Err(SetupError::UnsupportedChannels);
    }
    let consumer_format = AudioFormat::new(producer.format.sample_rate, output.encoding, output.channels);
    let connection = if producer.format.layout() == output.layout() {
        ConnectionKind::PassThrough
    } else if options.buffer_on_give {
        ConnectionKind::ConvertOnGive
    } else {
        ConnectionKind::ConvertOnTake
    };
    let consumer = match connection {
        ConnectionKind::PassThrough => PoolConfig::new(consumer_format, 0, producer.samples_per_buffer),
        _ => PoolConfig::new(consumer_format, options.buffer_count, options.samples_per_buffer),
    };
    Ok(StreamConfig {
        producer,
        consumer,
        connection,
    })
}

// ── Driver state ───────────────────────────────────────────────────────

/// Counters kept by the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Real buffers played to completion and recycled.
    pub buffers_played: u32,
    /// Silence transfers armed because nothing was prepared.
    pub underruns: u32,
    /// Divider writes caused by a producer rate change.
    pub rate_changes: u32,
    /// Callbacks that could not be delivered.
    pub callback_overruns: u32,
}

/// State shared between setup, the interrupt handler and teardown.
pub struct DriverSharedState<'a, const WORDS: usize> {
    /// Buffer each channel is transmitting or armed with. `None` while a
    /// channel plays silence.
    playing: [Option<AudioBuffer<'a, WORDS>>; 2],
    /// Rate the sequencer is clocked for right now.
    applied_rate: u32,
    /// Producer rate seen at the latest arm step.
    observed_rate: u32,
    /// Divider to write when the channel starts.
    pending: [Option<(u32, ClockDivider)>; 2],
}

impl<const WORDS: usize> DriverSharedState<'_, WORDS> {
    fn new() -> Self {
        DriverSharedState {
            playing: [None, None],
            applied_rate: 0,
            observed_rate: 0,
            pending: [None, None],
        }
    }

    pub fn applied_rate(&self) -> u32 {
        self.applied_rate
    }

    pub fn is_playing(&self, slot: usize) -> bool {
        self.playing[slot].is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    New,
    Configured,
    Connected,
    Enabled,
}

struct Resources {
    output: AudioFormat,
    hw: HardwareConfig,
}

// ── Output ─────────────────────────────────────────────────────────────

/// The I2S output driver instance.
pub struct I2sOutput<'a, const WORDS: usize, S, D, C = DirectCallback> {
    sequencer: S,
    dma: D,
    callback: C,
    config: OutputConfig,
    program: I2sProgram,
    stage: Stage,
    resources: Option<Resources>,
    stream: Option<&'a Stream<'a, WORDS>>,
    shared: DriverSharedState<'a, WORDS>,
    stats: EngineStats,
}

impl<'a, const WORDS: usize, S, D, C> I2sOutput<'a, WORDS, S, D, C>
where
    S: Sequencer,
    D: DmaController,
    C: CallbackDispatch,
{
    pub fn new(sequencer: S, dma: D, callback: C, config: OutputConfig) -> Self {
        I2sOutput {
            sequencer,
            dma,
            callback,
            config,
            program: I2sProgram::new(),
            stage: Stage::New,
            resources: None,
            stream: None,
            shared: DriverSharedState::new(),
            stats: EngineStats::default(),
        }
    }

    /// Validate `output` and `hw`, load the sequencer program and chain the
    /// DMA channels. Returns the format that will be on the wire.
    ///
    /// The output must be signed stereo; its width sets the wire resolution.
    pub fn setup(&mut self, output: AudioFormat, hw: &HardwareConfig) -> Result<AudioFormat, SetupError> {
        if self.stage != Stage::New {
            return Err(SetupError::InvalidState);
        }
        if !output.encoding.is_signed() {
            return Err(SetupError::UnsupportedFormat);
        }
        if output.channels != 2 {
            return Err(SetupError::UnsupportedChannels);
        }
        hw.validate()?;
        let divider = self.divider_for(output.encoding, output.sample_rate)?;

        let setup = SequencerSetup {
            state_machine: hw.state_machine,
            data_pin: hw.data_pin,
            clock_pin_base: hw.clock_pin_base,
            resolution: output.encoding.bits() as u8,
            entry_point: self.program.entry_point(),
        };
        self.sequencer.install(&self.program, &setup);
        self.sequencer.set_clock_divider(divider);
        let [a, b] = hw.dma_channels;
        self.dma.configure(a, b);
        self.dma.configure(b, a);

        self.shared.applied_rate = output.sample_rate;
        self.shared.observed_rate = output.sample_rate;
        self.resources = Some(Resources { output, hw: *hw });
        self.stage = Stage::Configured;

        log::info!(
            "i2s: setup data=GPIO{} bclk=GPIO{} lrclk=GPIO{} sm={} dma={}/{} {}-bit @ {} Hz",
            hw.data_pin,
            setup.bclk_pin(),
            setup.lrclk_pin(),
            hw.state_machine,
            a,
            b,
            setup.resolution,
            output.sample_rate
        );
        Ok(output)
    }

    /// Bind the consumer end of `stream`. The stream's consumer layout must
    /// equal the output format; build its config with [`connect_config`].
    pub fn connect(&mut self, stream: &'a Stream<'a, WORDS>) -> Result<(), SetupError> {
        let output = match (&self.stage, &self.resources) {
            (Stage::Configured, Some(r)) => r.output,
            _ => return Err(SetupError::InvalidState),
        };
        if stream.consumer().format().layout() != output.layout() {
            return Err(SetupError::FormatMismatch);
        }
        let rate = stream.producer().format().sample_rate();
        if rate != self.shared.applied_rate {
            let divider = self.divider_for(output.encoding, rate)?;
            self.sequencer.set_clock_divider(divider);
            self.log_divider(rate, divider);
            self.shared.applied_rate = rate;
        }
        self.shared.observed_rate = rate;
        self.stream = Some(stream);
        self.stage = Stage::Connected;
        log::info!("i2s: connected {:?} @ {} Hz", stream.connection_kind(), rate);
        Ok(())
    }

    /// Start or stop streaming. Both directions are idempotent.
    ///
    /// Enabling arms both channels before anything runs, so the first
    /// interrupt finds the partner channel already loaded. Disabling blocks
    /// until both channels are idle and returns their buffers to the stream.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), SetupError> {
        match (self.stage, enabled) {
            (Stage::Enabled, true) | (Stage::Connected, false) => Ok(()),
            (Stage::Connected, true) => {
                self.enable();
                Ok(())
            }
            (Stage::Enabled, false) => {
                self.disable();
                Ok(())
            }
            _ => Err(SetupError::InvalidState),
        }
    }

    fn enable(&mut self) {
        let [a, b] = self.channels();
        self.dma.claim(a);
        self.dma.claim(b);
        self.arm(0);
        self.arm(1);
        if let Some((rate, divider)) = self.shared.pending[0].take() {
            self.apply_divider(rate, divider);
        }
        self.dma.set_channel_irq_enabled(a, true);
        self.dma.set_channel_irq_enabled(b, true);
        self.dma.set_irq_line_enabled(true);
        self.callback.start();
        self.stage = Stage::Enabled;
        self.dma.start(a);
        self.sequencer.set_enabled(true);
        log::info!("i2s: enabled");
    }

    fn disable(&mut self) {
        let [a, b] = self.channels();
        self.callback.stop();
        self.dma.set_irq_line_enabled(false);
        self.dma.set_channel_irq_enabled(a, false);
        self.dma.set_channel_irq_enabled(b, false);
        for ch in [a, b] {
            self.dma.abort(ch);
            self.dma.ack_irq(ch);
            self.dma.release(ch);
        }
        self.sequencer.set_enabled(false);
        self.sequencer.drain_tx_fifo();
        for slot in self.shared.playing.iter_mut() {
            if let Some(buffer) = slot.take() {
                buffer.give();
            }
        }
        // A parked divider was never written; re-observe the rate on the
        // next enable.
        self.shared.pending = [None, None];
        self.shared.observed_rate = self.shared.applied_rate;
        self.stage = Stage::Connected;
        log::info!("i2s: disabled");
    }

    /// Shared DMA interrupt handler. Services every channel of the pair
    /// with a pending completion.
    pub fn on_dma_irq(&mut self) {
        if self.stage != Stage::Enabled {
            return;
        }
        let channels = self.channels();
        for (slot, ch) in channels.into_iter().enumerate() {
            if self.dma.irq_pending(ch) {
                self.dma.ack_irq(ch);
                self.transfer_complete(slot);
            }
        }
    }

    fn transfer_complete(&mut self, slot: usize) {
        if let Some(buffer) = self.shared.playing[slot].take() {
            buffer.give();
            self.stats.buffers_played += 1;
        }
        // The partner channel has just started: its rate takes effect now.
        if let Some((rate, divider)) = self.shared.pending[slot ^ 1].take() {
            self.apply_divider(rate, divider);
        }
        self.arm(slot);
        if !self.callback.dispatch() {
            self.stats.callback_overruns += 1;
            log::trace!("i2s: callback overrun");
        }
    }

    /// Load the next transfer into `slot`'s channel without starting it.
    fn arm(&mut self, slot: usize) {
        let Some(stream) = self.stream else {
            return;
        };
        let ch = self.channels()[slot];
        self.observe_rate(slot, stream);

        match stream.take(PoolRole::Consumer, false) {
            Some(buffer) if buffer.sample_count() > 0 => {
                // SAFETY: the buffer stays in `playing[slot]` until this
                // channel completes or is aborted.
                unsafe { self.dma.arm(ch, buffer.valid_words()) };
                self.shared.playing[slot] = Some(buffer);
            }
            empty => {
                drop(empty);
                let words = self.output_format().layout().words_for(SILENCE_BUFFER_SAMPLE_LENGTH);
                // SAFETY: SILENCE is a static that is never written.
                unsafe { self.dma.arm(ch, &SILENCE[..words]) };
                self.stats.underruns += 1;
                log::trace!("i2s: underrun on dma {}", ch);
            }
        }
    }

    fn observe_rate(&mut self, slot: usize, stream: &Stream<'_, WORDS>) {
        let rate = stream.producer().format().sample_rate();
        if rate == self.shared.observed_rate {
            return;
        }
        self.shared.observed_rate = rate;
        let encoding = self.output_format().encoding;
        match self.divider_for(encoding, rate) {
            Ok(divider) => self.shared.pending[slot] = Some((rate, divider)),
            Err(e) => panic!("i2s: cannot clock {} Hz: {}", rate, e),
        }
    }

    fn apply_divider(&mut self, rate: u32, divider: ClockDivider) {
        if rate == self.shared.applied_rate {
            return;
        }
        self.sequencer.set_clock_divider(divider);
        self.shared.applied_rate = rate;
        self.stats.rate_changes += 1;
        self.log_divider(rate, divider);
    }

    fn divider_for(&self, encoding: PcmEncoding, rate: u32) -> Result<ClockDivider, SetupError> {
        ClockDivider::compute(
            self.config.system_clock_hz,
            rate,
            encoding.bits(),
            self.config.divider_mode,
        )
    }

    fn log_divider(&self, rate: u32, divider: ClockDivider) {
        log::debug!(
            "i2s: {} Hz: sys {} Hz / {}.{:03} -> sequencer {} Hz",
            rate,
            self.config.system_clock_hz,
            divider.int,
            divider.frac as u32 * 1000 / 256,
            divider.sequencer_hz(self.config.system_clock_hz)
        );
    }

    fn channels(&self) -> [u8; 2] {
        self.resources
            .as_ref()
            .map_or(DEFAULT_DMA_CHANNELS, |r| r.hw.dma_channels)
    }

    fn output_format(&self) -> AudioFormat {
        self.resources
            .as_ref()
            .map_or(AudioFormat::stereo(0, PcmEncoding::S16), |r| r.output)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// `true` between a successful `set_enabled(true)` and the next disable.
    pub fn is_enabled(&self) -> bool {
        self.stage == Stage::Enabled
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Buffers in flight and the rate bookkeeping the interrupt owns.
    pub fn shared_state(&self) -> &DriverSharedState<'a, WORDS> {
        &self.shared
    }

    /// The sequencer backend.
    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Backends that poll or simulate transfers need the controller between
    /// interrupts.
    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// The callback dispatcher, e.g. to read a companion's state.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Stop streaming, unload the sequencer and hand the hardware back.
    /// Every buffer is back in the stream afterwards.
    pub fn end(mut self) -> (S, D, C) {
        if self.stage == Stage::Enabled {
            self.disable();
        }
        if self.resources.is_some() {
            self.sequencer.drain_tx_fifo();
            self.sequencer.uninstall();
            log::info!("i2s: ended");
        }
        (self.sequencer, self.dma, self.callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDma, MockSequencer};

    const OUT32: AudioFormat = AudioFormat::stereo(44_100, PcmEncoding::S32);

    type Output<'a> = I2sOutput<'a, 64, MockSequencer, MockDma>;

    fn output<'a>() -> Output<'a> {
        I2sOutput::new(
            MockSequencer::default(),
            MockDma::default(),
            DirectCallback::default(),
            OutputConfig::default(),
        )
    }

    #[test]
    fn hardware_config_validation() {
        assert_eq!(HardwareConfig::default().validate(), Ok(()));
        let bad_pin = HardwareConfig {
            data_pin: 17,
            ..Default::default()
        };
        assert_eq!(bad_pin.validate(), Err(SetupError::PinConflict));
        let top = HardwareConfig {
            clock_pin_base: 29,
            ..Default::default()
        };
        assert_eq!(top.validate(), Err(SetupError::PinConflict));
        let dma = HardwareConfig {
            dma_channels: [3, 3],
            ..Default::default()
        };
        assert_eq!(dma.validate(), Err(SetupError::DmaChannelConflict));
        let dma = HardwareConfig {
            dma_channels: [0, 12],
            ..Default::default()
        };
        assert_eq!(dma.validate(), Err(SetupError::DmaChannelConflict));
        let sm = HardwareConfig {
            state_machine: 4,
            ..Default::default()
        };
        assert_eq!(sm.validate(), Err(SetupError::InvalidStateMachine));
    }

    #[test]
    fn setup_installs_program_and_chains_dma() {
        let mut out = output();
        assert_eq!(out.setup(OUT32, &HardwareConfig::default()), Ok(OUT32));
        let seq = out.sequencer();
        let installed = seq.installed.unwrap();
        assert_eq!(installed.resolution, 32);
        assert_eq!(installed.counter_reload(), 30);
        assert_eq!(installed.entry_point, I2sProgram::new().entry_point());
        assert_eq!(seq.dividers, vec![ClockDivider::from_raw(5_668)]);
        assert_eq!(out.dma().chain[0], Some(1));
        assert_eq!(out.dma().chain[1], Some(0));
        assert_eq!(
            out.setup(OUT32, &HardwareConfig::default()),
            Err(SetupError::InvalidState)
        );
    }

    #[test]
    fn setup_rejects_unsupported_output() {
        let mut out = output();
        assert_eq!(
            out.setup(AudioFormat::stereo(44_100, PcmEncoding::U16), &HardwareConfig::default()),
            Err(SetupError::UnsupportedFormat)
        );
        assert_eq!(
            out.setup(AudioFormat::mono(44_100, PcmEncoding::S16), &HardwareConfig::default()),
            Err(SetupError::UnsupportedChannels)
        );
        assert_eq!(
            out.setup(AudioFormat::stereo(5_000_000, PcmEncoding::S32), &HardwareConfig::default()),
            Err(SetupError::DividerOutOfRange)
        );
        // Nothing was touched by the failed attempts.
        assert!(out.sequencer().installed.is_none());
        assert!(out.setup(OUT32, &HardwareConfig::default()).is_ok());
    }

    #[test]
    fn enable_before_connect_is_refused() {
        let mut out = output();
        assert_eq!(out.set_enabled(true), Err(SetupError::InvalidState));
        out.setup(OUT32, &HardwareConfig::default()).unwrap();
        assert_eq!(out.set_enabled(true), Err(SetupError::InvalidState));
    }

    #[test]
    fn connect_plans() {
        let s16 = AudioFormat::stereo(22_050, PcmEncoding::S16);
        let same = connect_config(&OUT32, PoolConfig::new(OUT32, 3, 512)).unwrap();
        assert_eq!(same.connection, ConnectionKind::PassThrough);
        assert_eq!(same.consumer.buffer_count, 0);

        let widen = connect_config(&OUT32, PoolConfig::new(s16, 3, 576)).unwrap();
        assert_eq!(widen.connection, ConnectionKind::ConvertOnTake);
        assert_eq!(widen.consumer.format, AudioFormat::stereo(22_050, PcmEncoding::S32));
        assert_eq!(widen.consumer.buffer_count, CONSUMER_BUFFER_COUNT);
        assert_eq!(widen.consumer.samples_per_buffer, CONSUMER_BUFFER_SAMPLE_LENGTH);

        let options = ConnectOptions {
            buffer_on_give: true,
            buffer_count: 4,
            samples_per_buffer: 128,
        };
        let on_give = connect_extra_config(&OUT32, PoolConfig::new(s16, 3, 576), options).unwrap();
        assert_eq!(on_give.connection, ConnectionKind::ConvertOnGive);
        assert_eq!(on_give.consumer.buffer_count, 4);

        assert_eq!(
            connect_thru_config(&OUT32, PoolConfig::new(s16, 3, 576)),
            Err(SetupError::FormatMismatch)
        );
        assert_eq!(
            connect_s8_config(&OUT32, PoolConfig::new(s16, 3, 576)),
            Err(SetupError::UnsupportedFormat)
        );
        let s8 = connect_s8_config(&OUT32, PoolConfig::new(AudioFormat::mono(8_000, PcmEncoding::U8), 3, 64));
        assert_eq!(s8.unwrap().connection, ConnectionKind::ConvertOnTake);
    }

    #[test]
    fn end_without_setup_returns_hardware() {
        let (seq, dma, _) = output().end();
        assert!(!seq.uninstalled);
        assert!(dma.transmitted.is_empty());
    }
}
