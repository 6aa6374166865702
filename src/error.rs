//! Our error types for the Elektro-Automatik PSUs.

use thiserror::Error;

use crate::catalog::DataType;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors raised by the protocol layer, independent of the serial channel in use.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unknown register {name:?}, available registers are: {}", available.join(", "))]
    UnknownRegister {
        name: String,
        /// Every register name known to the catalog, sorted.
        available: Vec<String>,
    },
    #[error("Cannot {operation} register {register:?} of type {data_type}")]
    UnsupportedType {
        register: String,
        data_type: DataType,
        operation: &'static str,
    },
    #[error("Value {value} is outside of [{min}, {max}]")]
    OutOfRange { value: f32, min: f32, max: f32 },
    #[error("CRC mismatch, expected {expected:#06X} but received {received:#06X}")]
    CrcMismatch { expected: u16, received: u16 },
    #[error("Expected {expected} bytes of register data, got {received}")]
    InvalidLength { expected: usize, received: usize },
}

/// Custom error type for Elektro-Automatik PSU communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Modbus protocol error: {0}")]
    ModbusError(rmodbus::ErrorKind),
    #[error("Communication timeout")]
    Timeout,
    #[error("Device answered function {function:#04X} with exception code {code:#04X}")]
    Exception { function: u8, code: u8 },
    #[error("Invalid response received")]
    InvalidResponse,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl<I: embedded_io::Error> From<rmodbus::ErrorKind> for Error<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        Error::ModbusError(err)
    }
}
