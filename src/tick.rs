//! Periodic tick and interrupt-shared flags
//!
//! The only state shared between interrupt handlers and the main loop are single bit flags. A
//! timer interrupt raises the tick [`Flag`] at [`TICK_RATE`]; the data plane consumes it to pace
//! keepalive packets.

use core::sync::atomic::{AtomicBool, Ordering};
use fugit::{HertzU32, MillisDurationU32};
use crate::error::Error;

/// Rate at which the tick interrupt must fire
pub const TICK_RATE: HertzU32 = HertzU32::Hz(100);

/// Interval between two ticks
pub const TICK_PERIOD: MillisDurationU32 = MillisDurationU32::millis(10);

/// A flag raised from interrupt context and consumed from the main loop
///
/// Uses an atomic swap where the target has one. On cores without compare-and-swap (e.g.
/// Cortex-M0) it falls back to plain loads and stores.
pub struct Flag(AtomicBool);

impl Flag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was raised.
    #[cfg(target_has_atomic = "8")]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Clear the flag, returning whether it was raised.
    ///
    /// Without compare-and-swap, a raise that lands between the load and the store is lost.
    #[cfg(not(target_has_atomic = "8"))]
    pub fn take(&self) -> bool {
        let raised = self.0.load(Ordering::Acquire);
        if raised {
            self.0.store(false, Ordering::Release);
        }
        raised
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

/// Reload value for a 16 bit up-counting auto-reload timer, so that it overflows at [`TICK_RATE`]
///
/// `timer_clock` is the rate at which the timer counts (i.e. after any prescaler). Fails with
/// [`Error::OutOfRange`] if one period does not fit into 16 bits.
pub fn reload_value(timer_clock: HertzU32) -> Result<u16, Error> {
    let counts = timer_clock.raw() / TICK_RATE.raw();
    if counts == 0 || counts > 0x1_0000 {
        return Err(Error::OutOfRange);
    }
    Ok((0x1_0000 - counts) as u16)
}
