//! Host-side stand-ins for the hardware seams, used by unit and integration
//! tests. Each mock records what the engine asked of it.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Condvar, Mutex};
use std::thread::JoinHandle;

use crate::companion::run_companion;
use crate::constants::DMA_CHANNEL_COUNT;
use crate::event::WaitEvent;
use crate::hw::{CompanionLink, DmaController, Mailbox, Sequencer};
use crate::sequencer::{ClockDivider, I2sProgram, SequencerSetup};

const CHANNELS: usize = DMA_CHANNEL_COUNT as usize;

// ── Wait event ─────────────────────────────────────────────────────────

/// Latched event on a mutex + condvar.
#[derive(Default)]
pub struct CondvarEvent {
    signalled: Mutex<bool>,
    cv: Condvar,
}

impl CondvarEvent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitEvent for CondvarEvent {
    fn wait(&self) {
        let mut signalled = self.signalled.lock().unwrap();
        while !*signalled {
            signalled = self.cv.wait(signalled).unwrap();
        }
        *signalled = false;
    }

    fn notify(&self) {
        *self.signalled.lock().unwrap() = true;
        self.cv.notify_all();
    }
}

// ── Delay ──────────────────────────────────────────────────────────────

/// `DelayNs` that returns at once, or sleeps for real when built with
/// [`NoopDelay::sleeping`]. Either way the requested time is totalled.
#[derive(Default)]
pub struct NoopDelay {
    sleep: bool,
    pub waited_ns: u64,
}

impl NoopDelay {
    pub fn sleeping() -> Self {
        NoopDelay {
            sleep: true,
            waited_ns: 0,
        }
    }
}

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waited_ns += ns as u64;
        if self.sleep {
            std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
        }
    }
}

// ── Sequencer ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSequencer {
    pub installed: Option<SequencerSetup>,
    pub program_len: usize,
    pub dividers: Vec<ClockDivider>,
    pub enabled: bool,
    pub enable_count: usize,
    pub fifo_drains: usize,
    pub uninstalled: bool,
}

impl Sequencer for MockSequencer {
    fn install(&mut self, program: &I2sProgram, setup: &SequencerSetup) {
        assert!(self.installed.is_none(), "program installed twice");
        self.installed = Some(*setup);
        self.program_len = program.program().code.len();
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) {
        self.dividers.push(divider);
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.enable_count += 1;
        }
        self.enabled = enabled;
    }

    fn drain_tx_fifo(&mut self) {
        self.fifo_drains += 1;
    }

    fn uninstall(&mut self) {
        assert!(self.installed.take().is_some(), "uninstall without install");
        self.uninstalled = true;
    }
}

// ── DMA ────────────────────────────────────────────────────────────────

/// Records every armed transfer. [`MockDma::complete_active`] plays the
/// running transfer to the end and starts its chain partner, as the
/// hardware does.
pub struct MockDma {
    pub claimed: [bool; CHANNELS],
    pub chain: [Option<u8>; CHANNELS],
    pub armed: [Option<Vec<u32>>; CHANNELS],
    pub irq_enabled: [bool; CHANNELS],
    pub pending: [bool; CHANNELS],
    pub line_enabled: bool,
    pub active: Option<u8>,
    /// Completed transfers, in wire order.
    pub transmitted: Vec<Vec<u32>>,
    pub aborts: usize,
}

impl Default for MockDma {
    fn default() -> Self {
        MockDma {
            claimed: [false; CHANNELS],
            chain: [None; CHANNELS],
            armed: Default::default(),
            irq_enabled: [false; CHANNELS],
            pending: [false; CHANNELS],
            line_enabled: false,
            active: None,
            transmitted: Vec::new(),
            aborts: 0,
        }
    }
}

impl MockDma {
    /// Finish the running transfer, raise its interrupt and start the
    /// chained channel.
    pub fn complete_active(&mut self) {
        let ch = self.active.expect("no transfer running") as usize;
        let words = self.armed[ch].take().expect("running channel was not armed");
        self.transmitted.push(words);
        if self.irq_enabled[ch] {
            self.pending[ch] = true;
        }
        let next = self.chain[ch].expect("channel has no chain partner");
        assert!(
            self.armed[next as usize].is_some(),
            "chained to channel {} which is not armed",
            next
        );
        self.active = Some(next);
    }
}

impl DmaController for MockDma {
    fn claim(&mut self, channel: u8) {
        assert!(!self.claimed[channel as usize], "DMA channel {} already claimed", channel);
        self.claimed[channel as usize] = true;
    }

    fn release(&mut self, channel: u8) {
        assert!(self.claimed[channel as usize], "DMA channel {} not claimed", channel);
        self.claimed[channel as usize] = false;
    }

    fn configure(&mut self, channel: u8, chain_to: u8) {
        self.chain[channel as usize] = Some(chain_to);
    }

    unsafe fn arm(&mut self, channel: u8, words: &[u32]) {
        assert!(self.claimed[channel as usize], "arming unclaimed channel {}", channel);
        assert!(self.active != Some(channel), "arming busy channel {}", channel);
        self.armed[channel as usize] = Some(words.to_vec());
    }

    fn start(&mut self, channel: u8) {
        assert!(self.armed[channel as usize].is_some(), "starting unarmed channel");
        self.active = Some(channel);
    }

    fn abort(&mut self, channel: u8) {
        self.armed[channel as usize] = None;
        if self.active == Some(channel) {
            self.active = None;
        }
        self.aborts += 1;
    }

    fn set_channel_irq_enabled(&mut self, channel: u8, enabled: bool) {
        self.irq_enabled[channel as usize] = enabled;
    }

    fn set_irq_line_enabled(&mut self, enabled: bool) {
        self.line_enabled = enabled;
    }

    fn irq_pending(&self, channel: u8) -> bool {
        self.pending[channel as usize]
    }

    fn ack_irq(&mut self, channel: u8) {
        self.pending[channel as usize] = false;
    }
}

// ── Companion ──────────────────────────────────────────────────────────

/// Companion-core end of a [`MockCompanion`].
pub struct MockCompanionEnd {
    tx: SyncSender<u32>,
    rx: Receiver<u32>,
}

impl Mailbox for MockCompanionEnd {
    fn try_push(&mut self, word: u32) -> bool {
        self.tx.try_send(word).is_ok()
    }

    fn try_pop(&mut self) -> Option<u32> {
        self.rx.try_recv().ok()
    }

    fn pop_blocking(&mut self) -> u32 {
        self.rx.recv().expect("main end hung up")
    }
}

type Callback = Box<dyn FnMut() + Send>;

/// Main-core end of a bounded mailbox pair. `launch` runs
/// [`run_companion`] on a thread.
pub struct MockCompanion {
    tx: SyncSender<u32>,
    rx: Receiver<u32>,
    companion: Option<MockCompanionEnd>,
    callback: Option<Callback>,
    thread: Option<JoinHandle<()>>,
}

impl MockCompanion {
    pub fn new(capacity: usize, callback: impl FnMut() + Send + 'static) -> Self {
        let mut link = Self::stalled(capacity);
        link.callback = Some(Box::new(callback));
        link
    }

    /// A companion that never runs: nothing is ever popped or answered.
    pub fn stalled(capacity: usize) -> Self {
        let (to_companion, companion_rx) = mpsc::sync_channel(capacity);
        let (companion_tx, from_companion) = mpsc::sync_channel(capacity);
        MockCompanion {
            tx: to_companion,
            rx: from_companion,
            companion: Some(MockCompanionEnd {
                tx: companion_tx,
                rx: companion_rx,
            }),
            callback: None,
            thread: None,
        }
    }

    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("companion thread panicked");
        }
    }
}

impl Mailbox for MockCompanion {
    fn try_push(&mut self, word: u32) -> bool {
        self.tx.try_send(word).is_ok()
    }

    fn try_pop(&mut self) -> Option<u32> {
        self.rx.try_recv().ok()
    }
}

impl CompanionLink for MockCompanion {
    fn launch(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let mut end = self.companion.take().expect("companion launched twice");
        self.thread = Some(std::thread::spawn(move || run_companion(&mut end, callback)));
    }
}
