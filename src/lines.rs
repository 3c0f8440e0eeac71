//! Interface for the JTAG signal lines
//!
//! The data plane never touches pins directly. It talks to a [`JtagLines`] implementation, which
//! can be the [`GpioLines`] driver below, a board specific implementation, or a mock in tests.

use bitflags::bitflags;
use core::convert::Infallible;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// Status bit carrying the sampled TDO (CONF_DONE) line
pub const STATUS_TDO: u8 = 0x01;
/// Status bit carrying the DATAOUT (nSTATUS) line
pub const STATUS_DATAOUT: u8 = 0x02;

bitflags! {
    /// Levels of the output signals, as encoded in the low 6 bits of a bit-bang command byte
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Lines: u8 {
        /// TCK / DCLK
        const TCK = 1 << 0;
        /// TMS / nCONFIG
        const TMS = 1 << 1;
        /// nCE. Not wired on this adapter.
        const NCE = 1 << 2;
        /// nCS. Not wired on this adapter.
        const NCS = 1 << 3;
        /// TDI / ASDI / DATA0
        const TDI = 1 << 4;
        /// Output enable
        const OE = 1 << 5;
    }
}

pub trait JtagLines {
    /// Drive all output lines to the given levels
    fn set_state(&mut self, lines: Lines);

    /// Sample the status lines. Bit 0 ([`STATUS_TDO`]) must carry TDO, other bits are ignored.
    fn get_state(&mut self) -> u8;

    /// Put `tdi` on TDI and pulse TCK once
    fn shift_out(&mut self, tdi: bool);

    /// Put `tdi` on TDI, sample TDO and pulse TCK once. Returns the sampled TDO level.
    fn shift_in_out(&mut self, tdi: bool) -> bool;
}

/// [`JtagLines`] implementation on top of `embedded-hal` pins
///
/// The pins must be infallible, which is the case for memory mapped GPIO on all the
/// microcontrollers this is meant for.
pub struct GpioLines<Tck, Tms, Tdi, Tdo, Oe> {
    tck: Tck,
    tms: Tms,
    tdi: Tdi,
    tdo: Tdo,
    oe: Oe,
}

impl<Tck, Tms, Tdi, Tdo, Oe> GpioLines<Tck, Tms, Tdi, Tdo, Oe>
where
    Tck: OutputPin<Error = Infallible>,
    Tms: OutputPin<Error = Infallible>,
    Tdi: OutputPin<Error = Infallible>,
    Tdo: InputPin<Error = Infallible>,
    Oe: OutputPin<Error = Infallible>,
{
    /// Take ownership of the pins. All outputs are driven low, which releases the target.
    pub fn new(tck: Tck, tms: Tms, tdi: Tdi, tdo: Tdo, oe: Oe) -> Self {
        let mut lines = Self { tck, tms, tdi, tdo, oe };
        lines.set_state(Lines::empty());
        lines
    }

    fn pulse_tck(&mut self) {
        drive(&mut self.tck, true);
        drive(&mut self.tck, false);
    }
}

fn drive<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    pin.set_state(PinState::from(high)).unwrap_or_else(|e| match e {})
}

impl<Tck, Tms, Tdi, Tdo, Oe> JtagLines for GpioLines<Tck, Tms, Tdi, Tdo, Oe>
where
    Tck: OutputPin<Error = Infallible>,
    Tms: OutputPin<Error = Infallible>,
    Tdi: OutputPin<Error = Infallible>,
    Tdo: InputPin<Error = Infallible>,
    Oe: OutputPin<Error = Infallible>,
{
    fn set_state(&mut self, lines: Lines) {
        // Data lines first, so they are stable when TCK changes.
        drive(&mut self.tdi, lines.contains(Lines::TDI));
        drive(&mut self.tms, lines.contains(Lines::TMS));
        drive(&mut self.oe, lines.contains(Lines::OE));
        drive(&mut self.tck, lines.contains(Lines::TCK));
    }

    fn get_state(&mut self) -> u8 {
        let tdo = self.tdo.is_high().unwrap_or_else(|e| match e {});
        if tdo { STATUS_TDO } else { 0 }
    }

    fn shift_out(&mut self, tdi: bool) {
        drive(&mut self.tdi, tdi);
        self.pulse_tck();
    }

    fn shift_in_out(&mut self, tdi: bool) -> bool {
        drive(&mut self.tdi, tdi);
        let tdo = self.tdo.is_high().unwrap_or_else(|e| match e {});
        self.pulse_tck();
        tdo
    }
}
