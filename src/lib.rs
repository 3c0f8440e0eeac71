//! USB-Blaster compatible JTAG adapter for USB device controllers
//!
//! This crate implements the device side of an Altera USB-Blaster: it answers the standard and
//! vendor control requests the host driver sends, serves a configuration block that looks like the
//! EEPROM of the FT245 bridge chip, and interprets the command bytes that arrive on the bulk OUT
//! endpoint by driving JTAG lines and sending sampled data back on the bulk IN endpoint.
//!
//! The controller is abstracted by the [`DeviceBus`] trait, the signal lines by [`JtagLines`].
//! Everything else lives in [`UsbJtag`], which is driven by calling [`UsbJtag::poll`]:
//!
//! ```ignore
//! static TICK: Flag = Flag::new();
//!
//! let mut jtag = UsbJtag::new(bus, lines, &TICK, &USB_BLASTER)?;
//! let mut result = jtag.connect();
//! loop {
//!     if let PollResult::PollAgain(delay) = result {
//!         timer.delay_ms(delay.to_millis());
//!         result = jtag.poll(true);
//!     } else {
//!         result = jtag.poll(false);
//!     }
//! }
//! ```
//!
//! The tick flag must be raised from a timer interrupt at [`tick::TICK_RATE`].

#![no_std]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod bus;
pub mod descriptor;
pub mod eeprom;
pub mod engine;
pub mod error;
pub mod lines;
pub mod ring;
pub mod tick;
pub mod types;
pub mod vendor;
mod control;

#[cfg(test)]
mod testing;

use fugit::MillisDurationU32;

use bus::{DeviceBus, Event};
use control::ControlState;
use descriptor::DescriptorSet;
use eeprom::{ConfigBlock, Identity};
use engine::Engine;
use error::Error;
use lines::JtagLines;
use tick::Flag;
use types::{ConnectionSpeed, FifoMode, JtagMaster, SetupPacket};

/// How long to stay disconnected when renumerating, so the host notices
pub const RENUMERATE_DELAY: MillisDurationU32 = MillisDurationU32::millis(250);

/// Result returned from `UsbJtag::poll`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollResult {
    /// Nothing special to report. Poll again when another interrupt happens
    None,
    /// Poll again after the given duration, passing `delay_complete = true`. This is used for the renumeration delay, without blocking.
    PollAgain(MillisDurationU32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Renumeration {
    Idle,
    /// Requested by the host, to be started after the current control transfer completes
    Requested,
    /// Disconnected, waiting for the delay to pass
    Disconnected,
}

pub struct UsbJtag<'t, B, L> {
    pub(crate) bus: B,
    pub(crate) lines: L,
    pub(crate) tick: &'t Flag,
    pub(crate) engine: Engine,
    pub(crate) config_block: ConfigBlock,
    pub(crate) control: ControlState,
    pub(crate) renumeration: Renumeration,
}

impl<'t, B: DeviceBus, L: JtagLines> UsbJtag<'t, B, L> {
    /// Set up the adapter.
    ///
    /// The adapter starts out driving the JTAG lines itself, with the FIFO in synchronous mode,
    /// asking for high speed. Nothing is sent on the bus until [`connect`](UsbJtag::connect) is called.
    ///
    /// Fails if the configuration block cannot be built from `identity`.
    pub fn new(mut bus: B, lines: L, tick: &'t Flag, identity: &Identity) -> Result<Self, Error> {
        let config_block = ConfigBlock::build(identity)?;

        bus.select_jtag_master(JtagMaster::Adapter);
        bus.select_fifo_mode(FifoMode::Synchronous);
        bus.select_speed(ConnectionSpeed::High);
        let descriptors = DescriptorSet::for_speed(bus.speed());

        Ok(Self {
            bus,
            lines,
            tick,
            engine: Engine::new(),
            config_block,
            control: ControlState::new(descriptors),
            renumeration: Renumeration::Idle,
        })
    }

    /// Attach to the bus.
    ///
    /// This renumerates, in case the host still remembers the device from before a reset. The
    /// returned [`PollResult::PollAgain`] must be honored like one returned from [`poll`](UsbJtag::poll).
    pub fn connect(&mut self) -> PollResult {
        self.start_renumeration()
    }

    fn start_renumeration(&mut self) -> PollResult {
        info!("Renumerating");
        self.bus.disconnect();
        self.renumeration = Renumeration::Disconnected;
        PollResult::PollAgain(RENUMERATE_DELAY)
    }

    /// Poll the adapter. This must be called reasonably often.
    ///
    /// Each call handles at most one bus event and then runs one pass of the data plane, so call it
    /// in a loop, not only from an interrupt handler.
    ///
    /// By default `delay_complete` should be passed as `false`.
    /// Only if `PollResult::PollAgain` was returned, `poll(true)` should be called once after the delay has passed.
    pub fn poll(&mut self, delay_complete: bool) -> PollResult {
        if self.renumeration == Renumeration::Disconnected {
            if !delay_complete {
                return PollResult::None;
            }
            debug!("Renumeration delay complete");
            self.bus.clear_pending_interrupts();
            self.bus.connect();
            self.renumeration = Renumeration::Idle;
        }

        if let Some(event) = self.bus.poll() {
            debug!("USB device event {}", event);
            match event {
                Event::Setup => {
                    let raw = self.bus.read_setup();
                    match SetupPacket::parse(&raw) {
                        Ok(setup) => control::handle_setup(self, setup),
                        Err(error) => {
                            warn!("Malformed SETUP packet: {}", error);
                            self.bus.stall_control();
                            self.bus.ack_handshake();
                        }
                    }
                }
                Event::BusReset | Event::HighSpeed => {
                    let speed = self.bus.speed();
                    debug!("Selecting descriptors for {} speed", speed);
                    self.control.descriptors = DescriptorSet::for_speed(speed);
                }
            }
        }

        if self.renumeration == Renumeration::Requested {
            return self.start_renumeration();
        }

        self.engine.run(&mut self.bus, &mut self.lines, self.tick);
        PollResult::None
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config_block(&self) -> &ConfigBlock {
        &self.config_block
    }
}
