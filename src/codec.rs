//! Conversion between raw register words and typed values.
//!
//! Multi-register values are stored high word first, every word big-endian, matching what the
//! Modbus request/response parsing hands us.

use crate::{
    catalog::{DataType, MAX_REGISTERS_PER_READ, RegisterDescriptor},
    error::ProtocolError,
};

/// Words to be written to consecutive registers.
pub type RegisterWords = heapless::Vec<u16, { MAX_REGISTERS_PER_READ as usize }>;

/// A decoded register value.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Text(String),
    UInt16(u16),
    UInt32(u32),
    Float32(f32),
}

impl RegisterValue {
    pub fn data_type(&self) -> DataType {
        match self {
            RegisterValue::Text(_) => DataType::Text,
            RegisterValue::UInt16(_) => DataType::UInt16,
            RegisterValue::UInt32(_) => DataType::UInt32,
            RegisterValue::Float32(_) => DataType::Float32,
        }
    }

    /// Numeric content as a float, `None` for text.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            RegisterValue::Text(_) => None,
            RegisterValue::UInt16(value) => Some(value as f32),
            RegisterValue::UInt32(value) => Some(value as f32),
            RegisterValue::Float32(value) => Some(value),
        }
    }

    /// Integer content, `None` for text and floats.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            RegisterValue::UInt16(value) => Some(value as u32),
            RegisterValue::UInt32(value) => Some(value),
            RegisterValue::Text(_) | RegisterValue::Float32(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RegisterValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            RegisterValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<u16> for RegisterValue {
    fn from(value: u16) -> Self {
        RegisterValue::UInt16(value)
    }
}

impl core::fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RegisterValue::Text(text) => f.write_str(text),
            RegisterValue::UInt16(value) => write!(f, "{value}"),
            RegisterValue::UInt32(value) => write!(f, "{value}"),
            RegisterValue::Float32(value) => write!(f, "{value}"),
        }
    }
}

/// Interpret the words read from the registers described by `descriptor`.
pub fn decode(
    descriptor: &RegisterDescriptor,
    registers: &[u16],
) -> Result<RegisterValue, ProtocolError> {
    let expected = descriptor.register_count() as usize;
    if registers.len() != expected {
        return Err(ProtocolError::InvalidLength {
            expected: expected * 2,
            received: registers.len() * 2,
        });
    }
    let value = match descriptor.data_type() {
        DataType::Text => RegisterValue::Text(decode_text(registers)),
        DataType::UInt16 => RegisterValue::UInt16(registers[0]),
        DataType::UInt32 => RegisterValue::UInt32(join_words(registers[0], registers[1])),
        DataType::Float32 => {
            RegisterValue::Float32(f32::from_bits(join_words(registers[0], registers[1])))
        }
    };
    Ok(value)
}

/// Same as [`decode`] but from the register bytes as they appear on the wire.
pub fn decode_bytes(
    descriptor: &RegisterDescriptor,
    bytes: &[u8],
) -> Result<RegisterValue, ProtocolError> {
    if bytes.len() != descriptor.byte_length() as usize {
        return Err(ProtocolError::InvalidLength {
            expected: descriptor.byte_length() as usize,
            received: bytes.len(),
        });
    }
    let words: RegisterWords = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    decode(descriptor, &words)
}

/// Produce the words to write to the registers described by `descriptor`.
///
/// Only 16 bit registers can be written.
pub fn encode(
    descriptor: &RegisterDescriptor,
    value: &RegisterValue,
) -> Result<RegisterWords, ProtocolError> {
    match (descriptor.data_type(), value) {
        (DataType::UInt16, RegisterValue::UInt16(value)) => {
            let mut words = RegisterWords::new();
            let _ = words.push(*value);
            Ok(words)
        }
        (DataType::UInt16, other) => Err(ProtocolError::InvalidArgument(format!(
            "{:?} is of type {} but received {:?}",
            descriptor.name(),
            DataType::UInt16,
            other
        ))),
        (DataType::Text | DataType::UInt32 | DataType::Float32, _) => {
            Err(unsupported_write(descriptor))
        }
    }
}

/// Encode an integer not yet known to fit the register, rejecting anything outside `[0, 65536)`.
pub fn encode_u32(
    descriptor: &RegisterDescriptor,
    value: u32,
) -> Result<RegisterWords, ProtocolError> {
    if descriptor.data_type() != DataType::UInt16 {
        return Err(unsupported_write(descriptor));
    }
    let value = u16::try_from(value).map_err(|_| {
        ProtocolError::InvalidArgument(format!(
            "{:?} is of type {} but received {} which does not fit",
            descriptor.name(),
            DataType::UInt16,
            value
        ))
    })?;
    encode(descriptor, &RegisterValue::UInt16(value))
}

fn unsupported_write(descriptor: &RegisterDescriptor) -> ProtocolError {
    ProtocolError::UnsupportedType {
        register: descriptor.name().into(),
        data_type: descriptor.data_type(),
        operation: "write",
    }
}

fn join_words(high: u16, low: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}

/// Two Latin-1 characters per register, first character in the high byte. Trailing NUL and
/// space padding is dropped.
fn decode_text(registers: &[u16]) -> String {
    let text: String = registers
        .iter()
        .flat_map(|word| word.to_be_bytes())
        .map(char::from)
        .collect();
    text.trim_end_matches(['\0', ' ']).to_owned()
}
