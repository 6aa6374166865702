//! The Modbus RTU flavour of CRC-16 which terminates every frame.

use crate::error::ProtocolError;

/// Reflected form of the 0x8005 polynomial.
const POLYNOMIAL: u16 = 0xA001;
const INITIAL_VALUE: u16 = 0xFFFF;

/// Compute the CRC of `bytes` as a single word.
pub fn crc16_word(bytes: &[u8]) -> u16 {
    let mut crc = INITIAL_VALUE;
    for &byte in bytes {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Compute the CRC of `bytes`, returned as `(lo, hi)` which is the order the bytes go on the wire.
pub fn crc16(bytes: &[u8]) -> (u8, u8) {
    let [lo, hi] = crc16_word(bytes).to_le_bytes();
    (lo, hi)
}

/// Check that the last two bytes of `frame` are the CRC of everything before them.
pub fn check_crc(frame: &[u8]) -> Result<(), ProtocolError> {
    if frame.len() < 3 {
        return Err(ProtocolError::InvalidLength {
            expected: 3,
            received: frame.len(),
        });
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    let expected = crc16_word(body);
    let received = u16::from_le_bytes([tail[0], tail[1]]);
    if expected != received {
        log::warn!("CRC mismatch on {:02X?}", frame);
        return Err(ProtocolError::CrcMismatch { expected, received });
    }
    Ok(())
}
