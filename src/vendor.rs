//! Vendor requests of the USB-Blaster
//!
//! The host driver talks to the FT245 through a handful of vendor requests. Reading the
//! configuration EEPROM is the only one it really depends on. The others switch modes of the
//! adapter board that a plain FT245 does not have.

use usb_device::{UsbDirection, control::Request};

use crate::{Renumeration, UsbJtag};
use crate::bus::DeviceBus;
use crate::control::reply;
use crate::error::Error;
use crate::lines::JtagLines;
use crate::types::{ConnectionSpeed, FifoMode, JtagMaster, SetupPacket};

/// Read two bytes of the configuration block
pub const READ_CONFIG: u8 = 0x90;
/// Select the speed to connect with, then renumerate
pub const CHANGE_SPEED: u8 = 0x91;
/// Select who drives the JTAG lines
pub const CHANGE_JTAG_MASTER: u8 = 0x92;
/// Switch the FIFO between synchronous and asynchronous mode
pub const CHANGE_FIFO_MODE: u8 = 0x93;
pub const GET_FIRMWARE_VERSION: u8 = 0x94;

pub const FIRMWARE_VERSION: &[u8] = b"4.2.0";

/// Modem status reply of the FT245, for requests that are not otherwise handled
const STATUS_PLACEHOLDER: [u8; 2] = [0x36, 0x83];

/// Word addressed configuration reads wrap around at the end of the 128 byte block
const CONFIG_OFFSET_MASK: u8 = 0x7F;

pub(crate) fn handle_vendor<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    match setup.direction() {
        UsbDirection::Out => {
            // The driver issues this before it starts sending data.
            if setup.request == Request::GET_STATUS {
                dev.engine.start();
            }
            Ok(())
        }
        UsbDirection::In => vendor_in(dev, setup),
    }
}

fn vendor_in<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    debug!("Vendor request {} index {}", setup.request, setup.index);
    let select_first = setup.index_low() == 0;
    match setup.request {
        READ_CONFIG => {
            let offset = ((setup.index_low() << 1) & CONFIG_OFFSET_MASK) as usize;
            let data = [dev.config_block.byte_at(offset)?, dev.config_block.byte_at(offset + 1)?];
            reply(&mut dev.bus, setup, &data)
        }
        CHANGE_SPEED => {
            let (speed, echo) = if select_first {
                (ConnectionSpeed::High, 0x02)
            } else {
                (ConnectionSpeed::Full, 0x01)
            };
            info!("Switching to {} speed", speed);
            dev.bus.select_speed(speed);
            dev.renumeration = Renumeration::Requested;
            reply(&mut dev.bus, setup, &[echo])
        }
        CHANGE_JTAG_MASTER => {
            let master = if select_first { JtagMaster::Adapter } else { JtagMaster::External };
            info!("JTAG master: {}", master);
            dev.bus.select_jtag_master(master);
            reply(&mut dev.bus, setup, &[])
        }
        CHANGE_FIFO_MODE => {
            let (mode, echo) = if select_first {
                (FifoMode::Synchronous, 0x00)
            } else {
                (FifoMode::Asynchronous, 0x01)
            };
            info!("FIFO mode: {}", mode);
            dev.bus.select_fifo_mode(mode);
            reply(&mut dev.bus, setup, &[echo])
        }
        GET_FIRMWARE_VERSION => reply(&mut dev.bus, setup, FIRMWARE_VERSION),
        other => {
            debug!("Unknown vendor request {}", other);
            reply(&mut dev.bus, setup, &STATUS_PLACEHOLDER)
        }
    }
}
