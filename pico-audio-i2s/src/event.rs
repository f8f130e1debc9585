//! Wake-up primitive for blocking `take`.
//!
//! A blocked taker sleeps in [`WaitEvent::wait`] until some `give` calls
//! [`WaitEvent::notify`]. Implementations must latch: a notify that lands
//! between the failed list pop and the `wait` call must still wake the
//! waiter, exactly like the Cortex-M event register.

/// Low-power wait / wake signal shared by both ends of a stream.
pub trait WaitEvent: Sync {
    /// Sleep until an event has been signalled since the last wait.
    fn wait(&self);

    /// Signal an event to every waiter.
    fn notify(&self);

    /// Called before any blocking take. Panics when the caller runs in a
    /// context that must never sleep, such as an interrupt handler.
    fn assert_can_block(&self) {}
}

/// `WFE` / `SEV` on Cortex-M. `SEV` also wakes the other core.
#[cfg(feature = "cortex-m")]
#[derive(Debug, Default, Clone, Copy)]
pub struct WfeEvent;

#[cfg(feature = "cortex-m")]
impl WaitEvent for WfeEvent {
    #[inline]
    fn wait(&self) {
        cortex_m::asm::wfe();
    }

    #[inline]
    fn notify(&self) {
        cortex_m::asm::sev();
    }

    fn assert_can_block(&self) {
        use cortex_m::peripheral::{scb::VectActive, SCB};
        assert!(
            matches!(SCB::vect_active(), VectActive::ThreadMode),
            "blocking take from interrupt context"
        );
    }
}
