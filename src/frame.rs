//! Assembly of raw request frames.
//!
//! Register reads and writes are generated through `rmodbus`, but the PSU's coils sit outside
//! of the standard register protocol so those frames are put together here by hand.
//!
//! Layout: `[0x00, function, addr_hi, addr_lo, payload.., crc_lo, crc_hi]`.

use crate::{crc::crc16, error::ProtocolError};

/// Largest frame we will ever assemble or accept, 256 bytes as in Modbus RTU.
pub const MAX_FRAME_LEN: usize = 256;

/// Address byte, the PSU requires this to always be zero.
pub const DEVICE_ADDRESS: u8 = 0x00;

/// Bytes a frame carries besides its payload.
pub const FRAME_OVERHEAD: usize = 6;

pub type Frame = heapless::Vec<u8, MAX_FRAME_LEN>;

/// The function codes this driver knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoil = 0x01,
    ReadHolding = 0x03,
    WriteSingleCoil = 0x05,
    WriteSingleRegister = 0x06,
}

impl From<FunctionCode> for u8 {
    fn from(value: FunctionCode) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for FunctionCode {
    type Error = ProtocolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(FunctionCode::ReadCoil),
            0x03 => Ok(FunctionCode::ReadHolding),
            0x05 => Ok(FunctionCode::WriteSingleCoil),
            0x06 => Ok(FunctionCode::WriteSingleRegister),
            other => Err(ProtocolError::InvalidArgument(format!(
                "function code {other} is not one of 1, 3, 5 or 6"
            ))),
        }
    }
}

/// Payload which switches a coil on or off.
pub const fn coil_payload(on: bool) -> [u8; 2] {
    if on { [0xFF, 0x00] } else { [0x00, 0x00] }
}

/// Build a frame from already typed parts.
///
/// Only fails if the payload doesn't fit into [`MAX_FRAME_LEN`].
pub fn build_frame(
    function: FunctionCode,
    register_address: u16,
    payload: &[u8],
) -> Result<Frame, ProtocolError> {
    if payload.len() > MAX_FRAME_LEN - FRAME_OVERHEAD {
        return Err(ProtocolError::InvalidArgument(format!(
            "payload of {} bytes does not fit into a frame",
            payload.len()
        )));
    }
    let [addr_hi, addr_lo] = register_address.to_be_bytes();

    let mut frame = Frame::new();
    // Capacity was checked above, so the extends below cannot fail.
    let _ = frame.extend_from_slice(&[DEVICE_ADDRESS, function.into(), addr_hi, addr_lo]);
    let _ = frame.extend_from_slice(payload);
    let (crc_lo, crc_hi) = crc16(&frame);
    let _ = frame.extend_from_slice(&[crc_lo, crc_hi]);
    Ok(frame)
}

/// Build a frame from unchecked values, rejecting anything which would produce a malformed frame.
pub fn build_raw_frame(
    function: u8,
    register_address: u32,
    payload: &[u16],
) -> Result<Frame, ProtocolError> {
    let function = FunctionCode::try_from(function)?;
    let register_address = u16::try_from(register_address).map_err(|_| {
        ProtocolError::InvalidArgument(format!(
            "register address {register_address} is outside of [0, 65536)"
        ))
    })?;
    let mut bytes: heapless::Vec<u8, MAX_FRAME_LEN> = heapless::Vec::new();
    for &value in payload {
        let byte = u8::try_from(value).map_err(|_| {
            ProtocolError::InvalidArgument(format!("payload value {value} is not an 8 bit value"))
        })?;
        bytes.push(byte).map_err(|_| {
            ProtocolError::InvalidArgument(format!(
                "payload of {} bytes does not fit into a frame",
                payload.len()
            ))
        })?;
    }
    build_frame(function, register_address, &bytes)
}
