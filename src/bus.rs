//! Interface for the USB device controller
//!
//! In order to use `usbjtag` on a given controller, there must be a [`DeviceBus`] implementation.
//!
//! The bus takes care of everything below the protocol: enumeration mechanics, endpoint
//! arming, address assignment and speed negotiation. The core only asks it for events, for the
//! bytes that arrived, and to send the bytes it has.

use crate::types::{ConnectionSpeed, EndpointAddress, FifoMode, JtagMaster};

pub trait DeviceBus {
    /// Check if there is an event pending on the bus, if there is return it.
    ///
    /// Interrupt handlers typically record events in [`Flag`](crate::tick::Flag)s, which this
    /// method takes one at a time.
    fn poll(&mut self) -> Option<Event>;

    /// Speed of the current connection
    fn speed(&self) -> ConnectionSpeed;

    /// The 8 bytes of the last SETUP packet
    fn read_setup(&self) -> [u8; 8];

    /// Load `data` into the EP0 IN buffer, to be sent in the DATA stage of the current control
    /// transfer. Never called with more than 64 bytes.
    fn write_control(&mut self, data: &[u8]);

    /// Answer the current control transfer with a STALL
    fn stall_control(&mut self);

    /// Complete the STATUS stage of the current control transfer
    ///
    /// Called once per SETUP, after either [`write_control`](DeviceBus::write_control) or
    /// [`stall_control`](DeviceBus::stall_control) (or neither, for requests without data).
    fn ack_handshake(&mut self);

    /// Is the halt condition set on the given endpoint?
    ///
    /// Only called with plausible endpoints (see [`EndpointAddress::is_plausible`]).
    fn endpoint_halted(&self, ep: EndpointAddress) -> bool;

    /// Set or clear the halt condition on the given endpoint
    fn set_endpoint_halt(&mut self, ep: EndpointAddress, halted: bool);

    /// Reset the data toggle of the given endpoint to DATA0
    fn reset_data_toggle(&mut self, ep: EndpointAddress);

    /// Bytes of the oldest filled buffer of the bulk OUT endpoint, or `None` if there is none
    fn bulk_out(&self) -> Option<&[u8]>;

    /// Hand the buffer returned by [`bulk_out`](DeviceBus::bulk_out) back to the hardware, so it
    /// can receive again
    fn release_bulk_out(&mut self);

    /// Is the bulk IN endpoint still holding a packet the host has not collected?
    fn bulk_in_busy(&self) -> bool;

    /// Submit one packet (at most 64 bytes) on the bulk IN endpoint
    fn write_bulk_in(&mut self, packet: &[u8]);

    /// Logically detach from the bus (drop the pull-up)
    fn disconnect(&mut self);

    /// Clear any USB interrupts that are still pending
    ///
    /// Called after a disconnect, so that nothing from before the renumeration is processed.
    fn clear_pending_interrupts(&mut self);

    /// Attach to the bus again
    fn connect(&mut self);

    /// Select the highest speed to negotiate on the next connect
    fn select_speed(&mut self, speed: ConnectionSpeed);

    /// Select who drives the JTAG lines
    fn select_jtag_master(&mut self, master: JtagMaster);

    /// Switch the FIFO interface between synchronous and asynchronous transfers
    fn select_fifo_mode(&mut self, mode: FifoMode);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A SETUP packet arrived on EP0 and can be read with [`DeviceBus::read_setup`]
    Setup,
    /// The host reset the bus
    BusReset,
    /// The host granted high speed operation
    HighSpeed,
}
