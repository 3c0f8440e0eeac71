//! The data plane
//!
//! Bytes arriving on the bulk OUT endpoint are interpreted the way the CPLD of a USB-Blaster does
//! it. There are two modes:
//!
//! **Bit-bang mode** (the default). For each byte `B`:
//! 1. Bit 6 of `B` is the "read" bit. It is remembered for the next step and for byte-shift mode.
//! 2. If bit 7 is set, switch to byte-shift mode for the next `B & 0x3F` bytes and do nothing else.
//! 3. Otherwise drive the lines from bits 0..=5 (see [`Lines`]). If the read bit was set, sample
//!    the status lines and queue `(DATAOUT << 1) | TDO` for the host. DATAOUT is not wired and
//!    always reads as 1.
//!
//! **Byte-shift mode**. Each byte is clocked out on TDI, least significant bit first. If the read
//! bit was set when entering the mode, TDO is sampled for each bit and the 8 samples (in the
//! same order) are queued as one byte for the host.
//!
//! Queued bytes go out on the bulk IN endpoint in packets of at most 62 bytes, each prefixed with
//! the two status bytes the FT245 puts in front of every packet. The host driver expects to hear
//! from the device regularly; when there is nothing to send, a header-only packet is sent on every
//! tick.

use crate::bus::DeviceBus;
use crate::error::Error;
use crate::lines::{JtagLines, Lines, STATUS_DATAOUT, STATUS_TDO};
use crate::ring::RingBuffer;
use crate::tick::Flag;

/// Capacity of the output ring
pub const OUT_BUFFER_LEN: usize = 256;
/// Modem and line status bytes of the FT245, at the start of every bulk IN packet
pub const PACKET_HEADER: [u8; 2] = [0x31, 0x60];
/// Most payload bytes in one bulk IN packet
pub const MAX_PAYLOAD: usize = 62;
pub const PACKET_LEN: usize = PACKET_HEADER.len() + MAX_PAYLOAD;

/// Ingestion only starts while at least this much room is left in the ring
const INGEST_HEADROOM: usize = 63;

const CMD_SHIFT: u8 = 0x80;
const CMD_READ: u8 = 0x40;
const CMD_COUNT_MASK: u8 = 0x3F;

pub struct Engine {
    /// Set by the host with a vendor request before it starts sending commands
    running: bool,
    /// Whether the last command byte had its read bit clear
    write_only: bool,
    /// Bytes still to be handled in byte-shift mode
    pending_shift: u8,
    /// Offset into the current bulk OUT buffer, if a previous pass stopped early
    resume_at: usize,
    out: RingBuffer<OUT_BUFFER_LEN>,
}

impl Engine {
    pub const fn new() -> Self {
        Self {
            running: false,
            write_only: true,
            pending_shift: 0,
            resume_at: 0,
            out: RingBuffer::new(),
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            info!("data plane running");
        }
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn write_only(&self) -> bool {
        self.write_only
    }

    /// Number of bytes still to be handled in byte-shift mode (0 in bit-bang mode)
    pub fn pending_shift(&self) -> u8 {
        self.pending_shift
    }

    /// Number of result bytes waiting to be sent
    pub fn pending(&self) -> usize {
        self.out.pending()
    }

    /// Is there enough room in the ring to take another chunk?
    pub fn accepts_input(&self) -> bool {
        self.out.pending() < OUT_BUFFER_LEN - INGEST_HEADROOM
    }

    /// One pass of the data plane: send what can be sent, then take in what arrived.
    ///
    /// Does nothing until [`start`](Engine::start) was called.
    pub fn run<B: DeviceBus, L: JtagLines>(&mut self, bus: &mut B, lines: &mut L, tick: &Flag) {
        if !self.running {
            return;
        }
        self.emit(bus, tick);
        if let Err(error) = self.receive(bus, lines) {
            trace!("ingestion deferred: {}", error);
        }
    }

    fn emit<B: DeviceBus>(&mut self, bus: &mut B, tick: &Flag) {
        if bus.bulk_in_busy() {
            return;
        }
        let mut packet = [0u8; PACKET_LEN];
        if let Some(len) = self.fill_packet(&mut packet) {
            bus.write_bulk_in(&packet[..len]);
            // Follow up with a short packet on the next pass, so the host sees the end of the
            // transfer.
            tick.raise();
        } else if tick.take() {
            bus.write_bulk_in(&PACKET_HEADER);
        }
    }

    fn receive<B: DeviceBus, L: JtagLines>(&mut self, bus: &mut B, lines: &mut L) -> Result<(), Error> {
        let Some(chunk) = bus.bulk_out() else {
            return Ok(());
        };
        let len = chunk.len();
        let start = self.resume_at.min(len);
        let consumed = self.ingest(&chunk[start..], lines)?;

        if start + consumed < len {
            self.resume_at = start + consumed;
        } else {
            self.resume_at = 0;
            bus.release_bulk_out();
        }
        Ok(())
    }

    /// Interpret `chunk`, returning how many of its bytes were consumed.
    ///
    /// Fails with [`Error::BufferFull`] (consuming nothing) if the ring does not have the required
    /// headroom. Otherwise the whole chunk is consumed, unless a byte that produces output finds
    /// the ring full. That can only happen for chunks longer than the headroom.
    pub fn ingest<L: JtagLines>(&mut self, chunk: &[u8], lines: &mut L) -> Result<usize, Error> {
        if !self.accepts_input() {
            return Err(Error::BufferFull);
        }
        for (i, &byte) in chunk.iter().enumerate() {
            if self.out.is_full() && self.produces_output(byte) {
                trace!("output ring full after {} of {} bytes", i, chunk.len());
                return Ok(i);
            }
            self.process(byte, lines)?;
        }
        Ok(chunk.len())
    }

    fn produces_output(&self, byte: u8) -> bool {
        if self.pending_shift > 0 {
            !self.write_only
        } else {
            byte & CMD_SHIFT == 0 && byte & CMD_READ != 0
        }
    }

    fn process<L: JtagLines>(&mut self, byte: u8, lines: &mut L) -> Result<(), Error> {
        if self.pending_shift > 0 {
            if self.write_only {
                shift_out(byte, lines);
            } else {
                self.out.push(shift_in_out(byte, lines))?;
            }
            self.pending_shift -= 1;
            return Ok(());
        }

        self.write_only = byte & CMD_READ == 0;
        if byte & CMD_SHIFT != 0 {
            self.pending_shift = byte & CMD_COUNT_MASK;
        } else {
            lines.set_state(Lines::from_bits_truncate(byte));
            if !self.write_only {
                self.out.push(STATUS_DATAOUT | (lines.get_state() & STATUS_TDO))?;
            }
        }
        Ok(())
    }

    /// Move up to [`MAX_PAYLOAD`] queued bytes into `packet`, behind the header.
    ///
    /// Returns the packet length, or `None` if nothing is queued.
    pub fn fill_packet(&mut self, packet: &mut [u8; PACKET_LEN]) -> Option<usize> {
        if self.out.is_empty() {
            return None;
        }
        packet[..PACKET_HEADER.len()].copy_from_slice(&PACKET_HEADER);
        let n = self.out.take_into(&mut packet[PACKET_HEADER.len()..]);
        Some(PACKET_HEADER.len() + n)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn shift_out<L: JtagLines>(byte: u8, lines: &mut L) {
    for bit in 0..8 {
        lines.shift_out(byte & (1 << bit) != 0);
    }
}

fn shift_in_out<L: JtagLines>(byte: u8, lines: &mut L) -> u8 {
    let mut result = 0;
    for bit in 0..8 {
        if lines.shift_in_out(byte & (1 << bit) != 0) {
            result |= 1 << bit;
        }
    }
    result
}
