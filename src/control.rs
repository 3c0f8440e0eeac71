//! Handling of control transfers on EP0
//!
//! Every SETUP packet goes through [`handle_setup`]. It either stages a reply (clipped to the
//! length the host asked for) or stalls, and then completes the handshake. Standard requests are
//! answered here, vendor requests are passed on to [`vendor`](crate::vendor).

use usb_device::{UsbDirection, control::{Recipient, Request, RequestType}};

use crate::{UsbJtag, vendor};
use crate::bus::DeviceBus;
use crate::descriptor::{self, DescriptorSet};
use crate::error::Error;
use crate::lines::JtagLines;
use crate::types::SetupPacket;

/// Feature selector for the halt condition of an endpoint
const FEATURE_ENDPOINT_HALT: u8 = 0;
/// Feature selector for the device test modes
const FEATURE_TEST_MODE: u8 = 2;

/// Maximum size of a DATA stage on EP0
const MAX_CONTROL_DATA: usize = 64;

/// Standard request state kept across control transfers
pub(crate) struct ControlState {
    pub configuration: u8,
    pub alternate_setting: u8,
    pub descriptors: DescriptorSet,
}

impl ControlState {
    pub fn new(descriptors: DescriptorSet) -> Self {
        Self { configuration: 0, alternate_setting: 0, descriptors }
    }
}

pub(crate) fn handle_setup<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: SetupPacket) {
    trace!("SETUP {}", setup);

    let result = match setup.kind() {
        RequestType::Standard => match setup.direction() {
            UsbDirection::In => standard_in(dev, &setup),
            UsbDirection::Out => standard_out(dev, &setup),
        },
        RequestType::Vendor => vendor::handle_vendor(dev, &setup),
        RequestType::Class | RequestType::Reserved => Err(Error::ProtocolStall),
    };

    if let Err(error) = result {
        debug!("Stalling request {} ({})", setup.request, error);
        dev.bus.stall_control();
    }
    dev.bus.ack_handshake();
}

/// Stage `data` as reply, clipped to what the host asked for
pub(crate) fn reply<B: DeviceBus>(bus: &mut B, setup: &SetupPacket, data: &[u8]) -> Result<(), Error> {
    let len = data.len().min(setup.length as usize).min(MAX_CONTROL_DATA);
    bus.write_control(&data[..len]);
    Ok(())
}

fn standard_in<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    match setup.request {
        Request::GET_CONFIGURATION => reply(&mut dev.bus, setup, &[dev.control.configuration]),
        Request::GET_INTERFACE => reply(&mut dev.bus, setup, &[dev.control.alternate_setting]),
        Request::GET_DESCRIPTOR => get_descriptor(dev, setup),
        Request::GET_STATUS => get_status(dev, setup),
        _ => Err(Error::ProtocolStall),
    }
}

fn get_descriptor<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    let descriptors = dev.control.descriptors;
    match setup.value_high() {
        descriptor::TYPE_DEVICE => reply(&mut dev.bus, setup, descriptors.device),
        descriptor::TYPE_DEVICE_QUALIFIER => reply(&mut dev.bus, setup, descriptors.device_qualifier),
        descriptor::TYPE_CONFIGURATION => reply(&mut dev.bus, setup, descriptors.configuration),
        descriptor::TYPE_OTHER_SPEED_CONFIGURATION => {
            let source = descriptors.other_speed_configuration;
            let mut buf = [0u8; MAX_CONTROL_DATA];
            let len = source.len().min(buf.len());
            buf[..len].copy_from_slice(&source[..len]);
            if len > 1 {
                buf[1] = descriptor::TYPE_OTHER_SPEED_CONFIGURATION;
            }
            reply(&mut dev.bus, setup, &buf[..len])
        }
        descriptor::TYPE_STRING => {
            let string = descriptor::STRINGS.get(setup.value_low() as usize).ok_or(Error::OutOfRange)?;
            reply(&mut dev.bus, setup, string)
        }
        _ => Err(Error::ProtocolStall),
    }
}

fn get_status<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    match setup.recipient() {
        // Bus powered, no remote wakeup
        Recipient::Device | Recipient::Interface => reply(&mut dev.bus, setup, &[0, 0]),
        Recipient::Endpoint => {
            let ep = setup.endpoint();
            if !ep.is_plausible() {
                return Err(Error::OutOfRange);
            }
            let halted = dev.bus.endpoint_halted(ep);
            reply(&mut dev.bus, setup, &[halted as u8, 0])
        }
        _ => Err(Error::ProtocolStall),
    }
}

fn standard_out<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket) -> Result<(), Error> {
    match setup.request {
        Request::SET_CONFIGURATION => {
            dev.control.configuration = setup.value_low();
            Ok(())
        }
        Request::SET_INTERFACE => {
            dev.control.alternate_setting = setup.value_low();
            Ok(())
        }
        Request::CLEAR_FEATURE => feature(dev, setup, false),
        Request::SET_FEATURE => feature(dev, setup, true),
        // The controller latches the address by itself
        Request::SET_ADDRESS => Ok(()),
        _ => Err(Error::ProtocolStall),
    }
}

fn feature<B: DeviceBus, L: JtagLines>(dev: &mut UsbJtag<'_, B, L>, setup: &SetupPacket, set: bool) -> Result<(), Error> {
    let selector = setup.value_low();
    match setup.recipient() {
        Recipient::Device if set && selector == FEATURE_TEST_MODE => Ok(()),
        Recipient::Endpoint if selector == FEATURE_ENDPOINT_HALT => {
            let ep = setup.endpoint();
            if !ep.is_plausible() {
                return Err(Error::OutOfRange);
            }
            dev.bus.set_endpoint_halt(ep, set);
            if !set {
                dev.bus.reset_data_toggle(ep);
            }
            Ok(())
        }
        Recipient::Device | Recipient::Endpoint => Err(Error::ProtocolStall),
        // Setting a feature on any other recipient is acknowledged and ignored
        _ if set => Ok(()),
        _ => Err(Error::ProtocolStall),
    }
}
