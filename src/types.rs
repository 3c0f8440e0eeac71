use usb_device::{UsbDirection, control::{Recipient, RequestType}};
use crate::error::Error;

/// Connection speed, as negotiated by the controller or requested by the host
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionSpeed {
    /// USB 1.1 full speed (12 Mbit/s)
    Full,
    /// USB 2.0 high speed (480 Mbit/s)
    High,
}

/// Who drives the JTAG lines of the target connector
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JtagMaster {
    /// The adapter itself (default)
    Adapter,
    /// An external source on the secondary connector
    External,
}

/// Transfer mode of the controller's FIFO interface
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoMode {
    Synchronous,
    Asynchronous,
}

/// Address of an endpoint, as found in the `index` field of endpoint directed requests.
///
/// The bottom 4 bits give the endpoint number, the top bit the direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointAddress(pub u8);

impl EndpointAddress {
    /// Endpoint number, with the direction bit stripped
    pub fn number(&self) -> u8 {
        self.0 & !0x80
    }

    /// Is this one of the endpoints the controller implements?
    ///
    /// Only endpoints 0, 1, 2, 4, 6 and 8 exist (in either direction). This does not check whether
    /// the endpoint is enabled.
    pub fn is_plausible(&self) -> bool {
        let number = self.number();
        number == 1 || (number <= 8 && number & 1 == 0)
    }
}

/// The 8 byte request descriptor sent in the SETUP stage of a control transfer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn new(direction: UsbDirection, request_type: RequestType, recipient: Recipient, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type: (recipient as u8) | ((request_type as u8) << 5) | (direction as u8),
            request,
            value,
            index,
            length,
        }
    }

    /// Decode a raw SETUP packet
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        parse::setup_packet(raw)
            .map(|(_, setup)| setup)
            .map_err(|_| Error::OutOfRange)
    }

    pub fn direction(&self) -> UsbDirection {
        self.request_type.into()
    }

    pub fn kind(&self) -> RequestType {
        match (self.request_type >> 5) & 0b11 {
            0 => RequestType::Standard,
            1 => RequestType::Class,
            2 => RequestType::Vendor,
            _ => RequestType::Reserved,
        }
    }

    pub fn recipient(&self) -> Recipient {
        match self.request_type & 0b1_1111 {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }

    pub fn value_low(&self) -> u8 {
        self.value as u8
    }

    pub fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub fn index_low(&self) -> u8 {
        self.index as u8
    }

    /// The endpoint addressed by an endpoint directed request
    pub fn endpoint(&self) -> EndpointAddress {
        EndpointAddress(self.index_low())
    }
}

pub mod parse {
    use nom::IResult;
    use nom::combinator::map;
    use nom::sequence::tuple;
    use nom::number::complete::{u8, le_u16};

    use super::SetupPacket;

    /// Parse a SETUP packet: two single byte fields followed by three little endian words
    pub fn setup_packet(input: &[u8]) -> IResult<&[u8], SetupPacket> {
        map(
            tuple((u8, u8, le_u16, le_u16, le_u16)),
            |(request_type, request, value, index, length)| {
                SetupPacket { request_type, request, value, index, length }
            }
        )(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usb_device::control::Request;

    #[test]
    fn test_setup_packet_parse() {
        let raw = [0xC0, 0x90, 0x34, 0x12, 0x05, 0x00, 0x02, 0x00];
        let setup = SetupPacket::parse(&raw).unwrap();
        assert_eq!(setup.request_type, 0xC0);
        assert_eq!(setup.request, 0x90);
        assert_eq!(setup.value, 0x1234);
        assert_eq!(setup.value_low(), 0x34);
        assert_eq!(setup.value_high(), 0x12);
        assert_eq!(setup.index_low(), 0x05);
        assert_eq!(setup.length, 2);
        assert_eq!(setup.direction(), UsbDirection::In);
        assert_eq!(setup.kind(), RequestType::Vendor);
        assert_eq!(setup.recipient(), Recipient::Device);
    }

    #[test]
    fn test_setup_packet_short_input() {
        assert_eq!(SetupPacket::parse(&[0x80, 0x06, 0x00]), Err(Error::OutOfRange));
    }

    #[test]
    fn test_setup_packet_new() {
        let setup = SetupPacket::new(
            UsbDirection::In,
            RequestType::Standard,
            Recipient::Endpoint,
            Request::GET_STATUS,
            0,
            0x81,
            2,
        );
        assert_eq!(setup.request_type, 0x82);
        assert_eq!(setup.recipient(), Recipient::Endpoint);
        assert_eq!(setup.endpoint(), EndpointAddress(0x81));
        assert_eq!(setup.endpoint().number(), 1);
    }

    #[test]
    fn test_request_type_classes() {
        let class = |rt: u8| SetupPacket { request_type: rt, request: 0, value: 0, index: 0, length: 0 }.kind();
        assert_eq!(class(0x00), RequestType::Standard);
        assert_eq!(class(0x21), RequestType::Class);
        assert_eq!(class(0x40), RequestType::Vendor);
        assert_eq!(class(0xE0), RequestType::Reserved);
    }

    #[test]
    fn test_plausible_endpoints() {
        for ep in 0..=0xFFu8 {
            let expected = matches!(ep & 0x7F, 0 | 1 | 2 | 4 | 6 | 8);
            assert_eq!(EndpointAddress(ep).is_plausible(), expected, "endpoint {:#x}", ep);
        }
    }
}
