//! A simulated power supply for unit tests, answering requests the way the real device does.
//!
//! Register addresses follow the built-in register table.

use std::collections::{BTreeMap, VecDeque};

use crate::{crc::check_crc, mock_serial::with_crc};

const REMOTE_MODE_COIL: u16 = 402;
/// Low word of the "device state" register pair at 505.
const DEVICE_STATE_LOW: u16 = 506;
const REMOTE_BIT: u16 = 1 << 11;

#[derive(Debug)]
pub struct MockDeviceError;

impl core::fmt::Display for MockDeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("no response")
    }
}

impl core::error::Error for MockDeviceError {}

impl embedded_io::Error for MockDeviceError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::TimedOut
    }
}

pub struct MockDevice {
    registers: BTreeMap<u16, u16>,
    request: Vec<u8>,
    response: VecDeque<u8>,
    /// Every complete request received, in order.
    pub requests: Vec<Vec<u8>>,
    /// Corrupt the CRC of the next response.
    pub corrupt_next_crc: bool,
}

impl MockDevice {
    /// An 80V / 40A supply, under local control with its settings at zero.
    pub fn new() -> Self {
        let mut device = Self {
            registers: BTreeMap::new(),
            request: Vec::new(),
            response: VecDeque::new(),
            requests: Vec::new(),
            corrupt_next_crc: false,
        };
        device.set_text(1, 40, "PS 9080-40 T");
        device.set_text(151, 40, "1234560001");
        device.set_text(171, 40, "EA Elektro-Automatik");
        device.set_float(121, 80.0);
        device.set_float(123, 40.0);
        device.set_float(125, 1000.0);
        for address in [0, 405, 500, 501, 502, 505, 506, 507, 508, 509] {
            device.registers.insert(address, 0);
        }
        device
    }

    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or_default()
    }

    pub fn set_float(&mut self, address: u16, value: f32) {
        let bits = value.to_bits();
        self.registers.insert(address, (bits >> 16) as u16);
        self.registers.insert(address + 1, bits as u16);
    }

    pub fn set_text(&mut self, address: u16, byte_length: u16, text: &str) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(byte_length as usize, 0);
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            self.registers
                .insert(address + i as u16, u16::from_be_bytes([pair[0], pair[1]]));
        }
    }

    pub fn is_remote(&self) -> bool {
        self.register(DEVICE_STATE_LOW) & REMOTE_BIT != 0
    }

    fn respond(&mut self, body: &[u8]) {
        let mut frame = with_crc(body);
        if self.corrupt_next_crc {
            self.corrupt_next_crc = false;
            let last = frame.len() - 1;
            frame[last] ^= 0xFF;
        }
        self.response.extend(frame);
    }

    fn exception(&mut self, function: u8, code: u8) {
        self.respond(&[0x00, function | 0x80, code]);
    }

    fn handle(&mut self, request: Vec<u8>) {
        if check_crc(&request).is_err() {
            return;
        }
        self.requests.push(request.clone());
        let function = request[1];
        let address = u16::from_be_bytes([request[2], request[3]]);
        let value = u16::from_be_bytes([request[4], request[5]]);
        match function {
            0x03 => {
                if (address..address + value).any(|a| !self.registers.contains_key(&a)) {
                    return self.exception(function, 0x02);
                }
                let mut body = vec![0x00, 0x03, (value * 2) as u8];
                for a in address..address + value {
                    body.extend_from_slice(&self.register(a).to_be_bytes());
                }
                self.respond(&body);
            }
            0x06 => {
                if !self.registers.contains_key(&address) {
                    return self.exception(function, 0x02);
                }
                self.registers.insert(address, value);
                self.respond(&request[..6]);
            }
            0x05 => {
                if address == REMOTE_MODE_COIL {
                    let state = self.register(DEVICE_STATE_LOW);
                    let state = if value == 0xFF00 {
                        state | REMOTE_BIT
                    } else {
                        state & !REMOTE_BIT
                    };
                    self.registers.insert(DEVICE_STATE_LOW, state);
                }
                self.respond(&request[..6]);
            }
            _ => self.exception(function, 0x01),
        }
    }
}

impl embedded_io::ErrorType for MockDevice {
    type Error = MockDeviceError;
}

impl embedded_io::Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.request.extend_from_slice(buf);
        // Every request this driver sends is 8 bytes long.
        while self.request.len() >= 8 {
            let request: Vec<u8> = self.request.drain(..8).collect();
            self.handle(request);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.response.is_empty() {
            return Err(MockDeviceError);
        }
        let count = buf.len().min(self.response.len());
        for (slot, byte) in buf.iter_mut().zip(self.response.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}
