/// Errors raised while handling a control transfer or a data-plane pass.
///
/// None of these are fatal. `ProtocolStall` and `OutOfRange` end up as a STALL on EP0 for the
/// current control transfer, `BufferFull` postpones ingestion to the next pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The request is not supported or is invalid
    ProtocolStall,
    /// A descriptor index, offset or endpoint number is outside of the defined bounds
    OutOfRange,
    /// The output ring buffer does not have enough headroom to accept another chunk
    BufferFull,
}
