//! Per-buffer application callback, called directly or on a second core.
//!
//! The DMA interrupt calls [`CallbackDispatch::dispatch`] once per completed
//! buffer. [`DirectCallback`] runs the hook right there. [`CompanionDispatch`]
//! instead posts a message to a companion core that runs the hook in
//! [`run_companion`], keeping refill work out of the interrupt.
//!
//! ```text
//!   main core                         companion core
//!   ─────────                         ──────────────
//!   launch ───────────────────────►   run_companion
//!          ◄────────────── Started
//!   TransferStarted ──────────────►   callback()
//!   TransferStarted ──────────────►   callback()
//!   Disabled ─────────────────────►
//!          ◄─────────── Terminated    return
//! ```
//!
//! Only the start and stop handshakes wait, and only up to a bound; missing
//! either is fatal. A `TransferStarted` is pushed with a zero bound: if the
//! FIFO is full at that instant it is dropped and reported as a callback
//! overrun. The interrupt never spins on the mailbox.

use embedded_hal::delay::DelayNs;

use crate::constants::HANDSHAKE_TIMEOUT_US;
use crate::hw::{CompanionLink, Mailbox};

/// Words exchanged over the inter-core mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CompanionMessage {
    /// Companion → main: loop is running.
    Started = 0xA0D1_0001,
    /// Main → companion: a buffer finished, run the callback.
    TransferStarted = 0xA0D1_0002,
    /// Main → companion: stop.
    Disabled = 0xA0D1_0003,
    /// Companion → main: stopped.
    Terminated = 0xA0D1_0004,
}

impl CompanionMessage {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            w if w == Self::Started as u32 => Some(Self::Started),
            w if w == Self::TransferStarted as u32 => Some(Self::TransferStarted),
            w if w == Self::Disabled as u32 => Some(Self::Disabled),
            w if w == Self::Terminated as u32 => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// How the engine delivers the per-buffer callback.
pub trait CallbackDispatch {
    /// Called once when output is enabled, before the first transfer.
    fn start(&mut self) {}

    /// Called from the DMA interrupt after each transfer is re-armed.
    /// Returns `false` if the callback could not be delivered. Must not
    /// wait: delivery that is not possible immediately counts as failed.
    fn dispatch(&mut self) -> bool;

    /// Called once when output is disabled.
    fn stop(&mut self) {}
}

/// Runs the callback inside the DMA interrupt. Must not block.
#[derive(Debug, Clone, Copy)]
pub struct DirectCallback(pub fn());

fn no_callback() {}

impl Default for DirectCallback {
    fn default() -> Self {
        DirectCallback(no_callback)
    }
}

impl CallbackDispatch for DirectCallback {
    #[inline]
    fn dispatch(&mut self) -> bool {
        (self.0)();
        true
    }
}

/// Runs the callback on a companion core.
pub struct CompanionDispatch<L, D> {
    link: L,
    delay: D,
    timeout_us: u32,
    running: bool,
}

impl<L: CompanionLink, D: DelayNs> CompanionDispatch<L, D> {
    pub fn new(link: L, delay: D) -> Self {
        Self::with_timeout(link, delay, HANDSHAKE_TIMEOUT_US)
    }

    pub fn with_timeout(link: L, delay: D, timeout_us: u32) -> Self {
        CompanionDispatch {
            link,
            delay,
            timeout_us,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn into_inner(self) -> (L, D) {
        (self.link, self.delay)
    }

    fn push_bounded(&mut self, message: CompanionMessage) -> bool {
        for _ in 0..=self.timeout_us {
            if self.link.try_push(message as u32) {
                return true;
            }
            self.delay.delay_us(1);
        }
        false
    }

    fn expect_bounded(&mut self, expected: CompanionMessage) -> bool {
        for _ in 0..=self.timeout_us {
            if let Some(word) = self.link.try_pop() {
                match CompanionMessage::from_word(word) {
                    Some(m) if m == expected => return true,
                    other => panic!("companion: expected {:?}, got {:?} ({:#x})", expected, other, word),
                }
            }
            self.delay.delay_us(1);
        }
        false
    }
}

impl<L: CompanionLink, D: DelayNs> CallbackDispatch for CompanionDispatch<L, D> {
    fn start(&mut self) {
        if self.running {
            return;
        }
        self.link.launch();
        if !self.expect_bounded(CompanionMessage::Started) {
            panic!("companion did not report Started within {} us", self.timeout_us);
        }
        self.running = true;
        log::info!("companion: started");
    }

    /// Single non-waiting push; `timeout_us` only bounds the handshakes.
    fn dispatch(&mut self) -> bool {
        self.running && self.link.try_push(CompanionMessage::TransferStarted as u32)
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        if !self.push_bounded(CompanionMessage::Disabled) {
            panic!("companion mailbox full: Disabled not delivered within {} us", self.timeout_us);
        }
        if !self.expect_bounded(CompanionMessage::Terminated) {
            panic!("companion did not report Terminated within {} us", self.timeout_us);
        }
        self.running = false;
        log::info!("companion: stopped");
    }
}

/// Companion core main loop. Returns after acknowledging `Disabled`.
///
/// # Panics
///
/// On any word that is not a main → companion message.
pub fn run_companion<M: Mailbox>(mailbox: &mut M, mut callback: impl FnMut()) {
    while !mailbox.try_push(CompanionMessage::Started as u32) {
        core::hint::spin_loop();
    }
    loop {
        let word = mailbox.pop_blocking();
        match CompanionMessage::from_word(word) {
            Some(CompanionMessage::TransferStarted) => callback(),
            Some(CompanionMessage::Disabled) => {
                while !mailbox.try_push(CompanionMessage::Terminated as u32) {
                    core::hint::spin_loop();
                }
                return;
            }
            other => panic!("companion: unexpected message {:?} ({:#x})", other, word),
        }
    }
}
