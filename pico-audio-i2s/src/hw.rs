//! Hardware seams.
//!
//! The engine drives the sequencer and DMA only through these traits, so the
//! same code runs against RP2040 registers on target and against recording
//! mocks in host tests. Methods are infallible register operations; a
//! backend panics if a resource it was asked to claim is already taken.

use crate::sequencer::{ClockDivider, I2sProgram, SequencerSetup};

/// One programmable I/O state machine running the I2S program.
pub trait Sequencer {
    /// Load `program`, configure pins, autopull and side-set per `setup`,
    /// preload Y and point the state machine at the entry point. Leaves it
    /// stopped.
    fn install(&mut self, program: &I2sProgram, setup: &SequencerSetup);

    fn set_clock_divider(&mut self, divider: ClockDivider);

    fn set_enabled(&mut self, enabled: bool);

    /// Discard anything left in the TX FIFO.
    fn drain_tx_fifo(&mut self);

    /// Unload the program and free the state machine.
    fn uninstall(&mut self);
}

/// The DMA controller, addressed by channel number.
///
/// Every channel the engine uses is configured once to write 32-bit words to
/// the sequencer TX FIFO, paced by the sequencer's data request, and to
/// trigger its partner channel on completion.
pub trait DmaController {
    /// Take exclusive use of `channel`.
    fn claim(&mut self, channel: u8);

    fn release(&mut self, channel: u8);

    /// Set up `channel` for TX FIFO writes, chaining to `chain_to`.
    fn configure(&mut self, channel: u8, chain_to: u8);

    /// Load read address and transfer count without starting the channel.
    ///
    /// # Safety
    ///
    /// `words` must stay valid and unmodified until the transfer completes
    /// or the channel is aborted.
    unsafe fn arm(&mut self, channel: u8, words: &[u32]);

    /// Start an armed channel.
    fn start(&mut self, channel: u8);

    /// Stop `channel` and wait until it is idle.
    fn abort(&mut self, channel: u8);

    /// Route `channel`'s completion to the shared DMA interrupt.
    fn set_channel_irq_enabled(&mut self, channel: u8, enabled: bool);

    /// Mask or unmask the shared DMA interrupt line.
    fn set_irq_line_enabled(&mut self, enabled: bool);

    fn irq_pending(&self, channel: u8) -> bool;

    fn ack_irq(&mut self, channel: u8);
}

/// One end of the inter-core FIFO pair.
pub trait Mailbox {
    /// Push without waiting. `false` if the FIFO is full.
    fn try_push(&mut self, word: u32) -> bool;

    fn try_pop(&mut self) -> Option<u32>;

    /// Wait for the next word.
    fn pop_blocking(&mut self) -> u32 {
        loop {
            if let Some(word) = self.try_pop() {
                return word;
            }
            core::hint::spin_loop();
        }
    }
}

/// The main core's end of the mailbox, able to start the companion core.
pub trait CompanionLink: Mailbox {
    /// Start the companion core running [`run_companion`](crate::companion::run_companion).
    fn launch(&mut self);
}
