//! RP2040 register backends for the driver's hardware traits.
//!
//! PIO0 runs the I2S program and the DMA block feeds its TX FIFO. Both are
//! programmed through raw register values so the backends work on whichever
//! state machine and channel pair the `HardwareConfig` names.

use pico_audio_i2s::{ClockDivider, DmaController, I2sProgram, Sequencer, SequencerSetup};
use rp_pico::hal::pac;

// ── PIO register fields ───────────────────────────────────────────────

const EXECCTRL_SIDE_EN: u32 = 1 << 30;
const EXECCTRL_SIDE_PINDIR: u32 = 1 << 29;
const EXECCTRL_WRAP_TOP_LSB: u32 = 12;
const EXECCTRL_WRAP_BOTTOM_LSB: u32 = 7;

const SHIFTCTRL_FJOIN_RX: u32 = 1 << 31;
const SHIFTCTRL_FJOIN_TX: u32 = 1 << 30;
const SHIFTCTRL_PULL_THRESH_LSB: u32 = 25;
const SHIFTCTRL_AUTOPULL: u32 = 1 << 17;

const PINCTRL_SIDESET_COUNT_LSB: u32 = 29;
const PINCTRL_SET_COUNT_LSB: u32 = 26;
const PINCTRL_OUT_COUNT_LSB: u32 = 20;
const PINCTRL_SIDESET_BASE_LSB: u32 = 10;
const PINCTRL_SET_BASE_LSB: u32 = 5;

const CTRL_SM_RESTART_LSB: u32 = 4;
const CTRL_CLKDIV_RESTART_LSB: u32 = 8;

/// IO_BANK0 function select for PIO0.
const FUNCSEL_PIO0: u32 = 6;

// ── DMA register fields ────────────────────────────────────────────────

const DMA_CTRL_EN: u32 = 1 << 0;
const DMA_CTRL_DATA_SIZE_WORD: u32 = 2 << 2;
const DMA_CTRL_INCR_READ: u32 = 1 << 4;
const DMA_CTRL_CHAIN_TO_LSB: u32 = 11;
const DMA_CTRL_TREQ_SEL_LSB: u32 = 15;

/// DREQ of PIO0 TX FIFO 0; the other state machines follow.
const DREQ_PIO0_TX0: u32 = 0;

/// Bring PIO0 and DMA out of reset.
pub fn unreset(resets: &pac::RESETS) {
    resets.reset().modify(|_, w| w.pio0().clear_bit().dma().clear_bit());
    while resets.reset_done().read().pio0().bit_is_clear() || resets.reset_done().read().dma().bit_is_clear() {}
}

// ── Sequencer ──────────────────────────────────────────────────────────

/// One PIO0 state machine. The program is always loaded at offset 0.
pub struct PioSequencer {
    pio: pac::PIO0,
    io: pac::IO_BANK0,
    sm: usize,
    program_len: usize,
}

impl PioSequencer {
    pub fn new(pio: pac::PIO0, io: pac::IO_BANK0) -> Self {
        PioSequencer {
            pio,
            io,
            sm: 0,
            program_len: 0,
        }
    }

    /// Address the DMA writes samples to.
    pub fn tx_fifo_address(&self, sm: u8) -> u32 {
        self.pio.txf(sm as usize).as_ptr() as u32
    }

    fn exec(&self, instruction: u16) {
        self.pio
            .sm(self.sm)
            .sm_instr()
            .write(|w| unsafe { w.bits(instruction as u32) });
    }

    /// Make `pin` an output of this state machine with a one-off `set pindirs`.
    fn set_output(&self, pin: u8) {
        let sm = self.pio.sm(self.sm);
        let saved = sm.sm_pinctrl().read().bits();
        sm.sm_pinctrl().write(|w| unsafe {
            w.bits((1 << PINCTRL_SET_COUNT_LSB) | ((pin as u32) << PINCTRL_SET_BASE_LSB))
        });
        self.exec(
            pio::InstructionOperands::SET {
                destination: pio::SetDestination::PINDIRS,
                data: 1,
            }
            .encode(),
        );
        sm.sm_pinctrl().write(|w| unsafe { w.bits(saved) });
    }
}

impl Sequencer for PioSequencer {
    fn install(&mut self, program: &I2sProgram, setup: &SequencerSetup) {
        let code = &program.program().code;
        for (i, instruction) in code.iter().enumerate() {
            self.pio.instr_mem(i).write(|w| unsafe { w.bits(*instruction as u32) });
        }
        self.program_len = code.len();
        self.sm = setup.state_machine as usize;

        for pin in [setup.data_pin, setup.bclk_pin(), setup.lrclk_pin()] {
            self.io
                .gpio(pin as usize)
                .gpio_ctrl()
                .write(|w| unsafe { w.bits(FUNCSEL_PIO0) });
        }

        let p = program.program();
        let sm = self.pio.sm(self.sm);
        let mut execctrl = ((p.wrap.source as u32) << EXECCTRL_WRAP_TOP_LSB)
            | ((p.wrap.target as u32) << EXECCTRL_WRAP_BOTTOM_LSB);
        if p.side_set.optional() {
            execctrl |= EXECCTRL_SIDE_EN;
        }
        if p.side_set.pindirs() {
            execctrl |= EXECCTRL_SIDE_PINDIR;
        }
        sm.sm_execctrl().write(|w| unsafe { w.bits(execctrl) });
        // Left shift, autopull every 32 bits (encoded as 0), TX joined.
        sm.sm_shiftctrl().write(|w| unsafe {
            w.bits(SHIFTCTRL_FJOIN_TX | SHIFTCTRL_AUTOPULL | (0 << SHIFTCTRL_PULL_THRESH_LSB))
        });

        for pin in [setup.data_pin, setup.bclk_pin(), setup.lrclk_pin()] {
            self.set_output(pin);
        }
        sm.sm_pinctrl().write(|w| unsafe {
            w.bits(
                ((p.side_set.bits() as u32) << PINCTRL_SIDESET_COUNT_LSB)
                    | (1 << PINCTRL_OUT_COUNT_LSB)
                    | ((setup.clock_pin_base as u32) << PINCTRL_SIDESET_BASE_LSB)
                    | setup.data_pin as u32,
            )
        });

        self.exec(setup.preload_instruction());
        self.exec(setup.start_instruction(0));
        log::debug!("pio0 sm{}: {} instructions loaded", self.sm, self.program_len);
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) {
        self.pio
            .sm(self.sm)
            .sm_clkdiv()
            .write(|w| unsafe { w.bits(divider.raw() << 8) });
    }

    fn set_enabled(&mut self, enabled: bool) {
        let mask = 1 << self.sm;
        self.pio.ctrl().modify(|r, w| unsafe {
            let bits = r.bits();
            if enabled {
                w.bits(bits | mask | (mask << CTRL_CLKDIV_RESTART_LSB))
            } else {
                w.bits(bits & !mask)
            }
        });
    }

    fn drain_tx_fifo(&mut self) {
        // Toggling a join setting clears both FIFOs.
        let shiftctrl = self.pio.sm(self.sm).sm_shiftctrl();
        shiftctrl.modify(|r, w| unsafe { w.bits(r.bits() ^ SHIFTCTRL_FJOIN_RX) });
        shiftctrl.modify(|r, w| unsafe { w.bits(r.bits() ^ SHIFTCTRL_FJOIN_RX) });
    }

    fn uninstall(&mut self) {
        self.set_enabled(false);
        let mask = 1 << self.sm;
        self.pio
            .ctrl()
            .modify(|r, w| unsafe { w.bits(r.bits() | (mask << CTRL_SM_RESTART_LSB)) });
        for i in 0..self.program_len {
            self.pio.instr_mem(i).write(|w| unsafe { w.bits(0) });
        }
        self.program_len = 0;
    }
}

// ── DMA ────────────────────────────────────────────────────────────────

/// The DMA block. Completions are routed to `DMA_IRQ_0`.
pub struct Rp2040Dma {
    dma: pac::DMA,
    claimed: u16,
    /// TX FIFO address and DREQ of the target state machine.
    write_addr: u32,
    treq: u32,
}

impl Rp2040Dma {
    pub fn new(dma: pac::DMA, write_addr: u32, state_machine: u8) -> Self {
        Rp2040Dma {
            dma,
            claimed: 0,
            write_addr,
            treq: DREQ_PIO0_TX0 + state_machine as u32,
        }
    }
}

impl DmaController for Rp2040Dma {
    fn claim(&mut self, channel: u8) {
        assert!(self.claimed & (1 << channel) == 0, "DMA channel {} already claimed", channel);
        self.claimed |= 1 << channel;
    }

    fn release(&mut self, channel: u8) {
        self.claimed &= !(1 << channel);
    }

    fn configure(&mut self, channel: u8, chain_to: u8) {
        let ch = self.dma.ch(channel as usize);
        ch.ch_write_addr().write(|w| unsafe { w.bits(self.write_addr) });
        ch.ch_al1_ctrl().write(|w| unsafe {
            w.bits(
                DMA_CTRL_EN
                    | DMA_CTRL_DATA_SIZE_WORD
                    | DMA_CTRL_INCR_READ
                    | ((chain_to as u32) << DMA_CTRL_CHAIN_TO_LSB)
                    | (self.treq << DMA_CTRL_TREQ_SEL_LSB),
            )
        });
    }

    unsafe fn arm(&mut self, channel: u8, words: &[u32]) {
        let ch = self.dma.ch(channel as usize);
        ch.ch_read_addr().write(|w| w.bits(words.as_ptr() as u32));
        ch.ch_trans_count().write(|w| w.bits(words.len() as u32));
    }

    fn start(&mut self, channel: u8) {
        self.dma
            .multi_chan_trigger()
            .write(|w| unsafe { w.bits(1 << channel) });
    }

    fn abort(&mut self, channel: u8) {
        let mask = 1 << channel;
        self.dma.chan_abort().write(|w| unsafe { w.bits(mask) });
        while self.dma.chan_abort().read().bits() & mask != 0 {}
    }

    fn set_channel_irq_enabled(&mut self, channel: u8, enabled: bool) {
        let mask = 1 << channel;
        self.dma.inte0().modify(|r, w| unsafe {
            if enabled {
                w.bits(r.bits() | mask)
            } else {
                w.bits(r.bits() & !mask)
            }
        });
    }

    fn set_irq_line_enabled(&mut self, enabled: bool) {
        if enabled {
            // SAFETY: the handler only touches state owned by the DMA task.
            unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::DMA_IRQ_0) };
        } else {
            cortex_m::peripheral::NVIC::mask(pac::Interrupt::DMA_IRQ_0);
        }
    }

    fn irq_pending(&self, channel: u8) -> bool {
        self.dma.ints0().read().bits() & (1 << channel) != 0
    }

    fn ack_irq(&mut self, channel: u8) {
        self.dma.ints0().write(|w| unsafe { w.bits(1 << channel) });
    }
}
