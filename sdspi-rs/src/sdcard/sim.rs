//! A byte-level card model for unit tests.
//!
//! `SimCard` sits on the far side of a [`ByteTransport`]: it decodes command
//! frames clocked in while selected, answers from an output queue and keeps
//! a sparse sector store. Every byte, command, token and delay is recorded
//! so tests can check exactly what went over the link.

use super::{
    constants::*,
    transport::ByteTransport,
};
use std::collections::{
    BTreeMap,
    VecDeque,
};

/// R1 "illegal command".
const R1_ILLEGAL: u8 = 0x04;
const R1_IDLE: u8 = 0x01;
/// Data response for a write error.
const DATA_RESPONSE_WRITE_ERROR: u8 = 0x0d;
/// Data error token (out of range).
const ERROR_TOKEN: u8 = 0x08;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SimKind {
    SdV2 { ccs: bool },
    SdV1,
    Mmc,
    /// Nothing on the bus answers.
    Silent,
}

struct WriteStream {
    next_block: usize,
    multi: bool,
    packets: usize,
    collecting: Option<Vec<u8>>,
}

struct ReadStream {
    next_block: usize,
    packets: usize,
}

pub(crate) struct SimCard {
    kind: SimKind,

    pub selected: bool,
    /// Every byte clocked out by the host.
    pub mosi: Vec<u8>,
    /// Number of fill (0xff) bytes clocked out by the host.
    pub reads: usize,
    pub deselected_clocks: usize,
    /// (opcode, argument) of each complete command frame.
    pub commands: Vec<(u8, u32)>,
    /// Data tokens seen in write mode.
    pub tokens: Vec<u8>,
    /// Data packets received, accepted or not.
    pub blocks_received: usize,
    pub delay_calls: u32,
    pub delay_total_us: u64,

    /// Hold DO low whenever there's nothing else to send.
    pub stuck_busy: bool,
    /// Hold DO low for this many more bytes.
    pub busy_polls: u32,
    /// Get stuck busy once this many data packets have been received.
    pub busy_after_blocks: Option<usize>,
    /// Get stuck busy after answering this opcode.
    pub busy_after_opcode: Option<u8>,
    /// How many ACMD41/CMD1 polls still report idle after GO_IDLE_STATE.
    pub idle_polls: u32,
    /// Trailing bytes of the SEND_IF_COND response.
    pub if_cond_echo: [u8; 4],
    pub refuse_block_len: bool,
    /// Byte sent between STOP_TRANSMISSION and its R1.
    pub stop_stuff_byte: u8,
    /// Data response sent for each accepted packet.
    pub data_response: u8,
    /// Reject the packet with this index within a write command.
    pub reject_write_at: Option<usize>,
    /// Send an error token instead of the packet with this index within a
    /// read command.
    pub fail_read_at: Option<usize>,
    /// Forget the power-up state: READ_OCR is refused.
    pub ocr_lost: bool,
    pub csd: [u8; 16],
    pub cid: [u8; 16],

    blocks: BTreeMap<usize, [u8; BLOCK_SIZE]>,
    out: VecDeque<u8>,
    frame: Vec<u8>,
    idle: bool,
    idle_left: u32,
    app_pending: bool,
    write: Option<WriteStream>,
    read: Option<ReadStream>,
}

impl SimCard {
    pub fn new(kind: SimKind) -> SimCard {
        SimCard {
            kind,
            selected: false,
            mosi: Vec::new(),
            reads: 0,
            deselected_clocks: 0,
            commands: Vec::new(),
            tokens: Vec::new(),
            blocks_received: 0,
            delay_calls: 0,
            delay_total_us: 0,
            stuck_busy: false,
            busy_polls: 0,
            busy_after_blocks: None,
            busy_after_opcode: None,
            idle_polls: 2,
            if_cond_echo: [0x00, 0x00, 0x01, 0xaa],
            refuse_block_len: false,
            stop_stuff_byte: IDLE_BYTE,
            data_response: 0xe5,
            reject_write_at: None,
            fail_read_at: None,
            ocr_lost: false,
            // 8 GB SDHC
            csd: [
                0x40, 0x0e, 0x00, 0x32, 0x5b, 0x59, 0x00, 0x00, 0x3b, 0x37, 0x7f, 0x80, 0x0a, 0x40, 0x00, 0x8b,
            ],
            cid: [
                0x03, b'S', b'D', b'S', b'L', b'1', b'6', b'G', 0x80, 0x12, 0x34, 0x56, 0x78, 0x01, 0x4a, 0x00,
            ],
            blocks: BTreeMap::new(),
            out: VecDeque::new(),
            frame: Vec::new(),
            idle: false,
            idle_left: 0,
            app_pending: false,
            write: None,
            read: None,
        }
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c.0).collect()
    }

    /// Bytes the card sends next, ahead of anything it decides on its own.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.out.extend(bytes.iter().copied());
    }

    /// Contents of sector `index` (zeros if never written).
    pub fn block(&self, index: usize) -> [u8; BLOCK_SIZE] {
        self.blocks.get(&index).copied().unwrap_or([0u8; BLOCK_SIZE])
    }

    pub fn set_block(&mut self, index: usize, data: [u8; BLOCK_SIZE]) {
        self.blocks.insert(index, data);
    }

    /// Put the card in write mode as if a write command had just been
    /// accepted.
    pub fn begin_write(&mut self, start_block: usize, multi: bool) {
        self.write = Some(WriteStream {
            next_block: start_block,
            multi,
            packets: 0,
            collecting: None,
        });
    }

    fn block_index(&self, arg: u32) -> usize {
        match self.kind {
            SimKind::SdV2 { ccs: true } => arg as usize,
            _ => arg as usize / BLOCK_SIZE,
        }
    }

    fn r1(&self) -> u8 {
        if self.idle {
            R1_IDLE
        } else {
            0x00
        }
    }

    /// Count one ACMD41/CMD1 poll down towards ready.
    fn op_cond_poll(&mut self) -> u8 {
        if self.idle_left > 0 {
            self.idle_left -= 1;
            R1_IDLE
        } else {
            self.idle = false;
            0x00
        }
    }

    fn packet(&mut self, data: &[u8]) {
        self.out.push_back(DATA_START_BLOCK);
        self.out.extend(data.iter().copied());
        self.out.extend([0x7a, 0x3c].iter().copied());
    }

    fn command(&mut self, opcode: u8, arg: u32) {
        self.commands.push((opcode, arg));
        if self.busy_after_opcode == Some(opcode) {
            self.stuck_busy = true;
        }
        let app = std::mem::replace(&mut self.app_pending, false);
        self.out.clear();
        self.read = None;

        if self.kind == SimKind::Silent {
            return;
        }

        match (app, opcode) {
            (_, 0) => {
                self.idle = true;
                self.idle_left = self.idle_polls;
                self.out.push_back(R1_IDLE);
            },
            (_, 8) => match self.kind {
                SimKind::SdV2 { .. } => {
                    self.out.push_back(self.r1());
                    let echo = self.if_cond_echo;
                    self.out.extend(echo.iter().copied());
                },
                _ => self.out.push_back(self.r1() | R1_ILLEGAL),
            },
            (_, 55) => {
                if self.kind == SimKind::Mmc {
                    self.out.push_back(self.r1() | R1_ILLEGAL);
                } else {
                    self.app_pending = true;
                    self.out.push_back(self.r1());
                }
            },
            (true, 41) | (false, 1) => {
                let r1 = self.op_cond_poll();
                self.out.push_back(r1);
            },
            (true, 23) => self.out.push_back(self.r1()),
            (_, 58) => {
                if self.ocr_lost {
                    self.out.push_back(R1_ILLEGAL);
                } else {
                    let ccs = match self.kind {
                        SimKind::SdV2 { ccs: true } => 0x40,
                        _ => 0x00,
                    };
                    let ocr = [self.r1(), 0x80 | ccs, 0xff, 0x80, 0x00];
                    self.out.extend(ocr.iter().copied());
                }
            },
            (_, 16) => {
                if self.refuse_block_len {
                    self.out.push_back(self.r1() | R1_ILLEGAL);
                } else {
                    self.out.push_back(self.r1());
                }
            },
            (_, 9) | (_, 10) => {
                let register = if opcode == 9 { self.csd } else { self.cid };
                self.out.extend([self.r1(), IDLE_BYTE].iter().copied());
                self.packet(&register);
            },
            (_, 12) => {
                let stuff = self.stop_stuff_byte;
                self.out.extend([stuff, 0x00].iter().copied());
            },
            (_, 17) => {
                let data = self.block(self.block_index(arg));
                self.out.extend([0x00, IDLE_BYTE].iter().copied());
                if self.fail_read_at == Some(0) {
                    self.out.push_back(ERROR_TOKEN);
                } else {
                    self.packet(&data);
                }
            },
            (_, 18) => {
                self.out.push_back(0x00);
                self.read = Some(ReadStream {
                    next_block: self.block_index(arg),
                    packets: 0,
                });
            },
            (_, 24) | (_, 25) => {
                self.out.push_back(0x00);
                self.begin_write(self.block_index(arg), opcode == 25);
            },
            _ => self.out.push_back(self.r1() | R1_ILLEGAL),
        }
    }

    /// Queue the next packet of a multiple block read.
    fn stream_next_packet(&mut self) {
        let (index, packet) = match self.read.as_mut() {
            Some(stream) => {
                let index = stream.next_block;
                stream.next_block += 1;
                stream.packets += 1;
                (index, stream.packets - 1)
            },
            None => return,
        };
        self.out.push_back(IDLE_BYTE);
        if self.fail_read_at == Some(packet) {
            self.out.push_back(ERROR_TOKEN);
            self.read = None;
        } else {
            let data = self.block(index);
            self.packet(&data);
        }
    }

    fn write_data(&mut self, byte: u8) {
        let stream = match self.write.as_mut() {
            Some(stream) => stream,
            None => return,
        };

        if let Some(packet) = stream.collecting.as_mut() {
            packet.push(byte);
            if packet.len() < BLOCK_SIZE + 2 {
                return;
            }
            let mut data = [0u8; BLOCK_SIZE];
            data.copy_from_slice(&packet[..BLOCK_SIZE]);
            stream.collecting = None;

            let index = stream.packets;
            let block = stream.next_block;
            let multi = stream.multi;
            stream.packets += 1;
            stream.next_block += 1;
            self.blocks_received += 1;

            let accepted =
                self.reject_write_at != Some(index) && self.data_response & DATA_RESPONSE_MASK == DATA_RESPONSE_ACCEPTED;
            if accepted {
                self.blocks.insert(block, data);
                self.out.push_back(self.data_response);
            } else if self.reject_write_at == Some(index) {
                self.out.push_back(DATA_RESPONSE_WRITE_ERROR);
            } else {
                self.out.push_back(self.data_response);
            }
            if self.busy_after_blocks == Some(self.blocks_received) {
                self.stuck_busy = true;
            }
            if !multi {
                self.write = None;
            }
            return;
        }

        match byte {
            DATA_START_BLOCK | DATA_START_MULTI_WRITE => {
                self.tokens.push(byte);
                stream.collecting = Some(Vec::with_capacity(BLOCK_SIZE + 2));
            },
            DATA_STOP_TRANSMISSION => {
                self.tokens.push(byte);
                self.write = None;
            },
            _ => (),
        }
    }

    fn clock_in(&mut self, byte: u8) {
        if self.write.is_some() {
            self.write_data(byte);
            return;
        }

        if !self.frame.is_empty() {
            self.frame.push(byte);
            if self.frame.len() == 6 {
                let opcode = self.frame[0] & 0x3f;
                let arg = u32::from_be_bytes([self.frame[1], self.frame[2], self.frame[3], self.frame[4]]);
                self.frame.clear();
                self.command(opcode, arg);
            }
        } else if byte & 0xc0 == 0x40 {
            self.frame.push(byte);
        }
    }
}

impl ByteTransport for SimCard {
    fn write_byte(&mut self, byte: u8) -> u8 {
        self.mosi.push(byte);
        if byte == IDLE_BYTE {
            self.reads += 1;
        }
        if !self.selected {
            self.deselected_clocks += 1;
            return IDLE_BYTE;
        }

        if self.out.is_empty() {
            self.stream_next_packet();
        }
        let miso = match self.out.pop_front() {
            Some(b) => b,
            None if self.busy_polls > 0 => {
                self.busy_polls -= 1;
                0x00
            },
            None if self.stuck_busy => 0x00,
            None => IDLE_BYTE,
        };
        self.clock_in(byte);
        miso
    }

    fn select(&mut self) {
        self.selected = true;
    }

    fn deselect(&mut self) {
        self.selected = false;
        self.out.clear();
        self.frame.clear();
        self.read = None;
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_calls += 1;
        self.delay_total_us += us as u64;
    }
}
