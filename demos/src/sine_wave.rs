//! Sine wave playback: simplest possible output example.
//!
//! Generates a 440 Hz sine and plays it on both channels of an I2S DAC
//! (PCM5102A, MAX98357A or similar). Every four seconds the sample rate
//! alternates between 44.1 kHz and 48 kHz while the pitch stays put.
//!
//! Hardware: Raspberry Pi Pico + any 3-wire I2S DAC
//!
//! Signal flow:
//! ```text
//!   SineTone ──► Stream (3 × 576 frames, S16 stereo) ──► I2sOutput ──► DAC
//!   (idle)                                               (DMA_IRQ_0)
//! ```
//!
//! Pins:
//!   GP18: DIN    GP16: BCK    GP17: LRCK

#![no_std]
#![no_main]

mod rp2040;

use panic_halt as _;

#[rtic::app(device = rp_pico::hal::pac, peripherals = true, dispatchers = [TIMER_IRQ_1])]
mod app {
    use crate::rp2040::{unreset, PioSequencer, Rp2040Dma};

    use pico_audio_i2s::tone::SineTone;
    use pico_audio_i2s::{
        connect_config, AudioFormat, BufferArena, DirectCallback, DividerMode, HardwareConfig, I2sOutput,
        OutputConfig, PcmEncoding, PoolConfig, PoolRole, Stream, WfeEvent,
    };
    use rp_pico::hal::{self, clocks::Clock};

    const WORDS: usize = 576;
    const FRAMES: usize = 576;
    /// Buffers between rate switches.
    const SWITCH_EVERY: u32 = 4 * 44_100 / FRAMES as u32;

    const OUTPUT: AudioFormat = AudioFormat::stereo(44_100, PcmEncoding::S16);

    static ARENA: BufferArena<3, WORDS> = BufferArena::new();
    static EVENT: WfeEvent = WfeEvent;

    type Output = I2sOutput<'static, WORDS, PioSequencer, Rp2040Dma>;

    // ── RTIC resources ───────────────────────────────────────────────

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        output: Output,
        stream: &'static Stream<'static, WORDS>,
        tone: SineTone,
    }

    // ── Init ─────────────────────────────────────────────────────────

    #[init(local = [stream: Option<Stream<'static, WORDS>> = None])]
    fn init(cx: init::Context) -> (Shared, Local) {
        let mut pac = cx.device;
        let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
        let Ok(clocks) = hal::clocks::init_clocks_and_plls(
            rp_pico::XOSC_CRYSTAL_FREQ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        ) else {
            panic!("clock init failed");
        };
        unreset(&pac.RESETS);

        let hw = HardwareConfig::default();
        let sequencer = PioSequencer::new(pac.PIO0, pac.IO_BANK0);
        let dma = Rp2040Dma::new(pac.DMA, sequencer.tx_fifo_address(hw.state_machine), hw.state_machine);

        let producer = PoolConfig::new(OUTPUT, 3, FRAMES);
        let config = match connect_config(&OUTPUT, producer) {
            Ok(config) => config,
            Err(e) => panic!("connect: {}", e),
        };
        let stream: &'static Stream<'static, WORDS> = match Stream::new(&ARENA, config, &EVENT) {
            Ok(stream) => cx.local.stream.insert(stream),
            Err(e) => panic!("stream: {}", e),
        };

        let mut output = I2sOutput::new(
            sequencer,
            dma,
            DirectCallback::default(),
            OutputConfig {
                system_clock_hz: clocks.system_clock.freq().to_Hz(),
                divider_mode: DividerMode::Fractional,
            },
        );
        if let Err(e) = output
            .setup(OUTPUT, &hw)
            .and_then(|_| output.connect(stream))
            .and_then(|_| output.set_enabled(true))
        {
            panic!("i2s: {}", e);
        }

        (
            Shared {},
            Local {
                output,
                stream,
                tone: SineTone::new(440.0, OUTPUT.sample_rate, 0.5),
            },
        )
    }

    // ── Producer: refill buffers, sleep on WFE when all are queued ───

    #[idle(local = [stream, tone, given: u32 = 0])]
    fn idle(cx: idle::Context) -> ! {
        let stream = *cx.local.stream;
        let tone = cx.local.tone;
        let given = cx.local.given;
        loop {
            let Some(mut buf) = stream.take(PoolRole::Producer, true) else {
                continue;
            };
            tone.fill(&mut buf);
            buf.give();

            *given += 1;
            if *given % SWITCH_EVERY == 0 {
                let rate = if stream.producer().format().sample_rate() == 44_100 {
                    48_000
                } else {
                    44_100
                };
                stream.set_sample_rate(rate);
                tone.set_sample_rate(rate);
            }
        }
    }

    // ── DMA ISR: recycle, re-arm, fire the callback ──────────────────

    #[task(binds = DMA_IRQ_0, local = [output], priority = 2)]
    fn dma_isr(cx: dma_isr::Context) {
        cx.local.output.on_dma_irq();
    }
}
