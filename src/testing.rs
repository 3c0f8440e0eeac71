//! Recording doubles of [`DeviceBus`] and [`JtagLines`] for unit tests

use std::collections::{BTreeSet, VecDeque};
use std::vec::Vec;

use crate::bus::{DeviceBus, Event};
use crate::lines::{JtagLines, Lines, STATUS_TDO};
use crate::types::{ConnectionSpeed, EndpointAddress, FifoMode, JtagMaster, SetupPacket};

pub struct MockBus {
    pub events: VecDeque<Event>,
    pub setup: [u8; 8],
    pub speed: ConnectionSpeed,

    /// Every DATA stage written on EP0
    pub control_replies: Vec<Vec<u8>>,
    pub stalls: usize,
    pub handshakes: usize,

    /// Raw addresses of halted endpoints
    pub halted: BTreeSet<u8>,
    pub toggle_resets: Vec<u8>,

    pub bulk_out: VecDeque<Vec<u8>>,
    pub in_busy: bool,
    pub bulk_in: Vec<Vec<u8>>,

    pub connected: bool,
    pub disconnects: usize,
    pub interrupt_clears: usize,
    pub selected_speed: Option<ConnectionSpeed>,
    pub jtag_master: Option<JtagMaster>,
    pub fifo_mode: Option<FifoMode>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            setup: [0; 8],
            speed: ConnectionSpeed::High,
            control_replies: Vec::new(),
            stalls: 0,
            handshakes: 0,
            halted: BTreeSet::new(),
            toggle_resets: Vec::new(),
            bulk_out: VecDeque::new(),
            in_busy: false,
            bulk_in: Vec::new(),
            connected: false,
            disconnects: 0,
            interrupt_clears: 0,
            selected_speed: None,
            jtag_master: None,
            fifo_mode: None,
        }
    }

    /// Queue a SETUP event carrying `setup`
    pub fn push_setup(&mut self, setup: SetupPacket) {
        let value = setup.value.to_le_bytes();
        let index = setup.index.to_le_bytes();
        let length = setup.length.to_le_bytes();
        self.setup = [
            setup.request_type, setup.request,
            value[0], value[1],
            index[0], index[1],
            length[0], length[1],
        ];
        self.events.push_back(Event::Setup);
    }

    pub fn last_reply(&self) -> Option<&[u8]> {
        self.control_replies.last().map(|reply| reply.as_slice())
    }
}

impl DeviceBus for MockBus {
    fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn speed(&self) -> ConnectionSpeed {
        self.speed
    }

    fn read_setup(&self) -> [u8; 8] {
        self.setup
    }

    fn write_control(&mut self, data: &[u8]) {
        assert!(data.len() <= 64);
        self.control_replies.push(data.to_vec());
    }

    fn stall_control(&mut self) {
        self.stalls += 1;
    }

    fn ack_handshake(&mut self) {
        self.handshakes += 1;
    }

    fn endpoint_halted(&self, ep: EndpointAddress) -> bool {
        assert!(ep.is_plausible());
        self.halted.contains(&ep.0)
    }

    fn set_endpoint_halt(&mut self, ep: EndpointAddress, halted: bool) {
        if halted {
            self.halted.insert(ep.0);
        } else {
            self.halted.remove(&ep.0);
        }
    }

    fn reset_data_toggle(&mut self, ep: EndpointAddress) {
        self.toggle_resets.push(ep.0);
    }

    fn bulk_out(&self) -> Option<&[u8]> {
        self.bulk_out.front().map(|chunk| chunk.as_slice())
    }

    fn release_bulk_out(&mut self) {
        self.bulk_out.pop_front();
    }

    fn bulk_in_busy(&self) -> bool {
        self.in_busy
    }

    fn write_bulk_in(&mut self, packet: &[u8]) {
        assert!(!self.in_busy);
        assert!(packet.len() <= 64);
        self.bulk_in.push(packet.to_vec());
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.disconnects += 1;
    }

    fn clear_pending_interrupts(&mut self) {
        self.interrupt_clears += 1;
    }

    fn connect(&mut self) {
        self.connected = true;
    }

    fn select_speed(&mut self, speed: ConnectionSpeed) {
        self.selected_speed = Some(speed);
    }

    fn select_jtag_master(&mut self, master: JtagMaster) {
        self.jtag_master = Some(master);
    }

    fn select_fifo_mode(&mut self, mode: FifoMode) {
        self.fifo_mode = Some(mode);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineOp {
    Set(u8),
    Get,
    ShiftOut(bool),
    ShiftInOut(bool),
}

/// Records every call; TDO samples are taken from `tdo` (low once it runs dry)
pub struct MockLines {
    pub ops: Vec<LineOp>,
    pub tdo: VecDeque<bool>,
}

impl MockLines {
    pub fn new() -> Self {
        Self { ops: Vec::new(), tdo: VecDeque::new() }
    }

    fn sample(&mut self) -> bool {
        self.tdo.pop_front().unwrap_or(false)
    }
}

impl JtagLines for MockLines {
    fn set_state(&mut self, lines: Lines) {
        self.ops.push(LineOp::Set(lines.bits()));
    }

    fn get_state(&mut self) -> u8 {
        self.ops.push(LineOp::Get);
        if self.sample() { STATUS_TDO } else { 0 }
    }

    fn shift_out(&mut self, tdi: bool) {
        self.ops.push(LineOp::ShiftOut(tdi));
    }

    fn shift_in_out(&mut self, tdi: bool) -> bool {
        self.ops.push(LineOp::ShiftInOut(tdi));
        self.sample()
    }
}
