//! Standard descriptors served to the host
//!
//! The adapter presents itself as an Altera USB-Blaster: one vendor specific interface with a
//! bulk IN endpoint (EP1, sampled data towards the host) and a bulk OUT endpoint (EP2, commands
//! from the host).
//!
//! Descriptors depend on the connection speed. A [`DescriptorSet`] bundles the ones that apply
//! to the current speed, and is reselected whenever the bus is reset or high speed is granted.

use crate::types::ConnectionSpeed;

/// `descriptor_type` of a device descriptor
pub const TYPE_DEVICE: u8 = 1;
/// `descriptor_type` of a configuration descriptor
pub const TYPE_CONFIGURATION: u8 = 2;
/// `descriptor_type` of a string descriptor
pub const TYPE_STRING: u8 = 3;
/// `descriptor_type` of an interface descriptor
pub const TYPE_INTERFACE: u8 = 4;
/// `descriptor_type` of an endpoint descriptor
pub const TYPE_ENDPOINT: u8 = 5;
/// `descriptor_type` of a device qualifier descriptor
pub const TYPE_DEVICE_QUALIFIER: u8 = 6;
/// `descriptor_type` of an other-speed configuration descriptor
pub const TYPE_OTHER_SPEED_CONFIGURATION: u8 = 7;

pub const VENDOR_ID: u16 = 0x09FB;
pub const PRODUCT_ID: u16 = 0x6001;
pub const DEVICE_RELEASE: u16 = 0x0400;
pub const USB_RELEASE: u16 = 0x0200;

/// Configuration attributes: bus powered, no remote wakeup
pub const ATTRIBUTES: u8 = 0x80;
/// Maximum power, in 2 mA units (150 mA)
pub const MAX_POWER: u8 = 0x4B;

/// Address of the bulk IN endpoint carrying sampled data to the host
pub const EP_DATA_IN: u8 = 0x81;
/// Address of the bulk OUT endpoint carrying commands from the host
pub const EP_DATA_OUT: u8 = 0x02;

const fn lo(value: u16) -> u8 {
    value as u8
}

const fn hi(value: u16) -> u8 {
    (value >> 8) as u8
}

pub static DEVICE: [u8; 18] = [
    18, TYPE_DEVICE,
    lo(USB_RELEASE), hi(USB_RELEASE),
    0x00, 0x00, 0x00, // class, subclass, protocol: per interface
    64,               // EP0 max packet size
    lo(VENDOR_ID), hi(VENDOR_ID),
    lo(PRODUCT_ID), hi(PRODUCT_ID),
    lo(DEVICE_RELEASE), hi(DEVICE_RELEASE),
    1, 2, 3,          // manufacturer, product, serial number strings
    1,                // configurations
];

pub static DEVICE_QUALIFIER: [u8; 10] = [
    10, TYPE_DEVICE_QUALIFIER,
    lo(USB_RELEASE), hi(USB_RELEASE),
    0x00, 0x00, 0x00,
    64,
    1,                // other-speed configurations
    0,                // reserved
];

const CONFIG_TOTAL_LENGTH: u16 = 9 + 9 + 7 + 7;

/// Build the configuration descriptor (with interface and endpoint descriptors appended) for a
/// given max packet size of the bulk OUT endpoint
const fn configuration(data_out_packet_size: u16) -> [u8; CONFIG_TOTAL_LENGTH as usize] {
    [
        9, TYPE_CONFIGURATION,
        lo(CONFIG_TOTAL_LENGTH), hi(CONFIG_TOTAL_LENGTH),
        1,                // interfaces
        1,                // configuration value
        0,                // configuration string
        ATTRIBUTES,
        MAX_POWER,

        9, TYPE_INTERFACE,
        0,                // interface number
        0,                // alternate setting
        2,                // endpoints
        0xFF, 0xFF, 0xFF, // vendor specific class, subclass, protocol
        2,                // interface string

        7, TYPE_ENDPOINT,
        EP_DATA_IN,
        0x02,             // bulk
        64, 0,            // EP1 is 64 bytes at either speed
        0,

        7, TYPE_ENDPOINT,
        EP_DATA_OUT,
        0x02,             // bulk
        lo(data_out_packet_size), hi(data_out_packet_size),
        0,
    ]
}

pub static HIGH_SPEED_CONFIGURATION: [u8; CONFIG_TOTAL_LENGTH as usize] = configuration(512);
pub static FULL_SPEED_CONFIGURATION: [u8; CONFIG_TOTAL_LENGTH as usize] = configuration(64);

/// Turn an ASCII string into a string descriptor (UTF-16LE). `N` must be `2 + 2 * s.len()`.
pub const fn string_descriptor<const N: usize>(s: &[u8]) -> [u8; N] {
    assert!(N == 2 + 2 * s.len() && N <= 0xFF);
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = TYPE_STRING;
    let mut i = 0;
    while i < s.len() {
        out[2 + 2 * i] = s[i];
        i += 1;
    }
    out
}

/// String descriptor 0: supported languages (US English only)
pub static LANGUAGES: [u8; 4] = [4, TYPE_STRING, 0x09, 0x04];
pub static MANUFACTURER: [u8; 14] = string_descriptor(b"Altera");
pub static PRODUCT: [u8; 24] = string_descriptor(b"USB-Blaster");
pub static SERIAL_NUMBER: [u8; 18] = string_descriptor(b"00000000");

/// All string descriptors, by index
pub static STRINGS: [&[u8]; 4] = [&LANGUAGES, &MANUFACTURER, &PRODUCT, &SERIAL_NUMBER];

/// The descriptors that apply to the current connection speed
#[derive(Copy, Clone)]
pub struct DescriptorSet {
    pub device: &'static [u8],
    pub device_qualifier: &'static [u8],
    pub configuration: &'static [u8],
    /// Configuration that would apply at the other speed. Stored with `TYPE_CONFIGURATION`;
    /// the type byte is patched when it is served.
    pub other_speed_configuration: &'static [u8],
}

impl DescriptorSet {
    pub fn for_speed(speed: ConnectionSpeed) -> Self {
        let (configuration, other_speed_configuration): (&'static [u8], &'static [u8]) = match speed {
            ConnectionSpeed::High => (&HIGH_SPEED_CONFIGURATION, &FULL_SPEED_CONFIGURATION),
            ConnectionSpeed::Full => (&FULL_SPEED_CONFIGURATION, &HIGH_SPEED_CONFIGURATION),
        };
        Self {
            device: &DEVICE,
            device_qualifier: &DEVICE_QUALIFIER,
            configuration,
            other_speed_configuration,
        }
    }
}
