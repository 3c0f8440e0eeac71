//! Emulation of the FT245 configuration EEPROM
//!
//! The host driver reads the bridge chip's EEPROM two bytes at a time through a vendor request
//! and validates its checksum. The contents are assembled once at startup from an [`Identity`].
//!
//! Layout of the 128 byte block:
//!
//! | offset | content |
//! |--------|---------|
//! | 0      | reserved (2 bytes) |
//! | 2      | vendor id, product id, release (little endian) |
//! | 8      | configuration attributes, max power |
//! | 10     | chip configuration marker `0x1C, 0x00` |
//! | 12     | USB release |
//! | 14     | offset and length of the manufacturer, product, serial strings |
//! | 20     | the three string descriptors, then the string order table |
//! | ...    | zero fill |
//! | 126    | checksum (little endian) |

use crate::descriptor;
use crate::error::Error;

pub const CONFIG_BLOCK_LEN: usize = 128;

const CHECKSUM_OFFSET: usize = CONFIG_BLOCK_LEN - 2;
const CHECKSUM_SEED: u16 = 0xAAAA;
/// String offsets are relative to this base, as the FT245 maps its string area at 0x80
const STRING_BASE: u8 = 0x80;
const CHIP_CONFIG: [u8; 2] = [0x1C, 0x00];

/// Everything the configuration block is built from
pub struct Identity {
    /// Vendor id, product id and release, each little endian
    pub vid_pid_release: [u8; 6],
    /// Configuration attributes and max power
    pub attributes_power: [u8; 2],
    /// USB release, little endian
    pub usb_release: [u8; 2],
    /// Manufacturer, product and serial number string descriptors
    pub strings: [&'static [u8]; 3],
    pub string_order: [u8; 4],
}

/// The identity of an Altera USB-Blaster, matching the served descriptors
pub static USB_BLASTER: Identity = Identity {
    vid_pid_release: [
        descriptor::VENDOR_ID as u8, (descriptor::VENDOR_ID >> 8) as u8,
        descriptor::PRODUCT_ID as u8, (descriptor::PRODUCT_ID >> 8) as u8,
        descriptor::DEVICE_RELEASE as u8, (descriptor::DEVICE_RELEASE >> 8) as u8,
    ],
    attributes_power: [descriptor::ATTRIBUTES, descriptor::MAX_POWER],
    usb_release: [descriptor::USB_RELEASE as u8, (descriptor::USB_RELEASE >> 8) as u8],
    strings: [&descriptor::MANUFACTURER, &descriptor::PRODUCT, &descriptor::SERIAL_NUMBER],
    string_order: [0x02, 0x03, 0x01, 0x00],
};

/// Checksum over `bytes`, taken as (even, odd) pairs. A trailing odd byte is ignored.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.chunks_exact(2).fold(CHECKSUM_SEED, |sum, pair| mix(sum, pair[0], pair[1]))
}

fn mix(sum: u16, even: u8, odd: u8) -> u16 {
    (sum ^ ((odd as u16) << 8) ^ (even as u16)).rotate_left(1)
}

/// Accumulates the block, keeping the checksum up to date as pairs complete
struct Builder {
    data: [u8; CONFIG_BLOCK_LEN],
    len: usize,
    sum: u16,
}

impl Builder {
    fn new() -> Self {
        Self { data: [0; CONFIG_BLOCK_LEN], len: 0, sum: CHECKSUM_SEED }
    }

    fn append(&mut self, byte: u8) -> Result<(), Error> {
        if self.len >= CHECKSUM_OFFSET {
            return Err(Error::OutOfRange);
        }
        if self.len & 1 == 1 {
            self.sum = mix(self.sum, self.data[self.len - 1], byte);
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), Error> {
        bytes.iter().try_for_each(|b| self.append(*b))
    }

    /// Zero fill up to the checksum and store it. The data is zeroed already, so the fill only
    /// has to be folded into the sum.
    fn finish(mut self) -> ConfigBlock {
        if self.len & 1 == 1 {
            self.sum = mix(self.sum, self.data[self.len - 1], 0);
            self.len += 1;
        }
        for _ in (self.len..CHECKSUM_OFFSET).step_by(2) {
            self.sum = mix(self.sum, 0, 0);
        }
        self.data[CHECKSUM_OFFSET..].copy_from_slice(&self.sum.to_le_bytes());
        ConfigBlock { data: self.data }
    }
}

/// The assembled, immutable configuration block
pub struct ConfigBlock {
    data: [u8; CONFIG_BLOCK_LEN],
}

impl ConfigBlock {
    /// Assemble the block for `identity`.
    ///
    /// Fails with [`Error::OutOfRange`] if the strings do not fit in front of the checksum.
    pub fn build(identity: &Identity) -> Result<Self, Error> {
        let mut builder = Builder::new();
        builder.extend(&[0x00, 0x00])?;
        builder.extend(&identity.vid_pid_release)?;
        builder.extend(&identity.attributes_power)?;
        builder.extend(&CHIP_CONFIG)?;
        builder.extend(&identity.usb_release)?;

        // Three (offset, length) pairs, the strings follow directly after them.
        let mut offset = STRING_BASE.wrapping_add(builder.len as u8).wrapping_add(6);
        for s in identity.strings {
            let length = string_length(s)?;
            builder.extend(&[offset, length])?;
            offset = offset.wrapping_add(length);
        }
        for s in identity.strings {
            builder.extend(&s[..string_length(s)? as usize])?;
        }

        builder.extend(&identity.string_order)?;
        Ok(builder.finish())
    }

    /// Byte at `offset`, or [`Error::OutOfRange`] past the end of the block
    pub fn byte_at(&self, offset: usize) -> Result<u8, Error> {
        self.data.get(offset).copied().ok_or(Error::OutOfRange)
    }

    pub fn as_bytes(&self) -> &[u8; CONFIG_BLOCK_LEN] {
        &self.data
    }

    /// The checksum stored in the last two bytes
    pub fn stored_checksum(&self) -> u16 {
        u16::from_le_bytes([self.data[CHECKSUM_OFFSET], self.data[CHECKSUM_OFFSET + 1]])
    }
}

/// The length of a string descriptor, from its first byte
fn string_length(s: &[u8]) -> Result<u8, Error> {
    match s.first() {
        Some(&length) if length as usize <= s.len() => Ok(length),
        _ => Err(Error::OutOfRange),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_stored() {
        let block = ConfigBlock::build(&USB_BLASTER).unwrap();
        assert_eq!(checksum(&block.as_bytes()[..CHECKSUM_OFFSET]), block.stored_checksum());
    }

    #[test]
    fn test_checksum_detects_mutation() {
        let block = ConfigBlock::build(&USB_BLASTER).unwrap();
        let mut bytes = *block.as_bytes();
        bytes[40] ^= 0x01;
        assert_ne!(checksum(&bytes[..CHECKSUM_OFFSET]), block.stored_checksum());
    }

    #[test]
    fn test_checksum_algorithm() {
        assert_eq!(checksum(&[]), 0xAAAA);
        // 0xAAAA ^ 0x0201 = 0xA8AB, rotated left = 0x5157
        assert_eq!(checksum(&[0x01, 0x02]), 0x5157);
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), 0x5157);
    }

    #[test]
    fn test_layout() {
        let block = ConfigBlock::build(&USB_BLASTER).unwrap();
        let bytes = block.as_bytes();
        assert_eq!(&bytes[0..14], &[
            0x00, 0x00,
            0xFB, 0x09, 0x01, 0x60, 0x00, 0x04,
            0x80, 0x4B,
            0x1C, 0x00,
            0x00, 0x02,
        ]);
        // strings start at 20, offsets are relative to 0x80
        assert_eq!(&bytes[14..20], &[0x94, 14, 0x94 + 14, 24, 0x94 + 14 + 24, 18]);
        assert_eq!(&bytes[20..34], &descriptor::MANUFACTURER[..]);
        assert_eq!(&bytes[34..58], &descriptor::PRODUCT[..]);
        assert_eq!(&bytes[58..76], &descriptor::SERIAL_NUMBER[..]);
        assert_eq!(&bytes[76..80], &USB_BLASTER.string_order[..]);
        assert!(bytes[80..CHECKSUM_OFFSET].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_checksum_for_other_identities() {
        static LONG: [u8; 54] = descriptor::string_descriptor(b"A rather long product name");
        let identity = Identity {
            vid_pid_release: [0x34, 0x12, 0x78, 0x56, 0x01, 0x00],
            attributes_power: [0xC0, 0x32],
            usb_release: [0x10, 0x01],
            strings: [&descriptor::MANUFACTURER, &LONG, &descriptor::SERIAL_NUMBER],
            string_order: [1, 2, 3, 4],
        };
        let block = ConfigBlock::build(&identity).unwrap();
        assert_eq!(checksum(&block.as_bytes()[..CHECKSUM_OFFSET]), block.stored_checksum());
    }

    #[test]
    fn test_strings_too_long() {
        static HUGE: [u8; 90] = descriptor::string_descriptor(b"This string is far too long to fit the block");
        let identity = Identity {
            strings: [&HUGE, &descriptor::PRODUCT, &descriptor::SERIAL_NUMBER],
            ..USB_BLASTER
        };
        assert!(matches!(ConfigBlock::build(&identity), Err(Error::OutOfRange)));
    }

    #[test]
    fn test_checksum_with_odd_fill_start() {
        // A 5 byte string leaves the builder on an odd offset before the fill
        static ODD: [u8; 5] = [5, descriptor::TYPE_STRING, b'a', 0, b'b'];
        let identity = Identity {
            strings: [&ODD, &descriptor::PRODUCT, &descriptor::SERIAL_NUMBER],
            ..USB_BLASTER
        };
        let block = ConfigBlock::build(&identity).unwrap();
        assert_eq!(&block.as_bytes()[20..25], &ODD[..]);
        assert!(block.as_bytes()[71..CHECKSUM_OFFSET].iter().all(|b| *b == 0));
        assert_eq!(checksum(&block.as_bytes()[..CHECKSUM_OFFSET]), block.stored_checksum());
    }

    #[test]
    fn test_byte_at() {
        let block = ConfigBlock::build(&USB_BLASTER).unwrap();
        assert_eq!(block.byte_at(2), Ok(0xFB));
        assert_eq!(block.byte_at(127), Ok((block.stored_checksum() >> 8) as u8));
        assert_eq!(block.byte_at(128), Err(Error::OutOfRange));
    }
}
