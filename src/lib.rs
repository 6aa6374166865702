//! This crate provides an interface for communicating with and controlling the Elektro-Automatik series of programmable
//! power supplies.
//!
//! Example series which this should work with:
//! * PS 9000
//! * PSI 9000
//! * PSB 9000
//!
//! It uses ModBus RTU over the USB virtual COM port. The device address is always `0`. The
//! remote control coil is not part of the standard register protocol, so its frames are built
//! by this crate directly.
//!
//! Registers are addressed by name through a [`catalog::RegisterCatalog`], either the built-in
//! one or one parsed from a register table. Voltages and currents are exchanged as a fraction
//! of the device's nominal values, see [`scaling`].
//!
//! The serial port used for PSU comms is left for the caller to open and configure, any
//! interface implementing [`embedded_io::Read`] & [`embedded_io::Write`] will do. With the
//! `serialport` feature, [`port`] wraps a [serialport] port and [`discovery`] lists the
//! connected devices.

pub mod catalog;
pub mod codec;
pub mod crc;
pub mod error;
pub mod frame;
pub mod psu;
pub mod registers;
pub mod scaling;
pub mod types;

#[cfg(feature = "serialport")]
pub mod discovery;
#[cfg(feature = "serialport")]
pub mod port;

#[cfg(test)]
mod mock_device;
#[cfg(test)]
mod mock_serial;

pub use catalog::{DataType, RegisterCatalog, RegisterDescriptor};
pub use codec::RegisterValue;
pub use error::{Error, ProtocolError};
pub use psu::PowerSupply;
