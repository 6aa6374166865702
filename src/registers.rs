//! This module defines the registers of the Elektro-Automatik power supplies.
//!
//! Addresses are those of the PS/PSI series ModBus register list. Devices with a different
//! register map can supply their own table through [`RegisterCatalog::from_table`].

use crate::{
    catalog::{DataType, RegisterCatalog, RegisterDescriptor},
    error::ProtocolError,
};

/// __R__ - Manufacturer name.
pub const MANUFACTURER: &str = "manufacturer";
/// __R__ - Device model.
pub const DEVICE_TYPE: &str = "device type";
/// __R__ - Serial number.
pub const SERIAL_NUMBER: &str = "serial number";
/// __R__ - Nominal voltage in volts, the 100% point of every voltage register.
pub const NOMINAL_VOLTAGE: &str = "nominal voltage";
/// __R__ - Nominal current in amps, the 100% point of every current register.
pub const NOMINAL_CURRENT: &str = "nominal current";
/// __W__ - Coil. Remote control on/off.
pub const REMOTE_MODE: &str = "remote mode";
/// __R/W__ - Voltage setting, `0xCCCC` is nominal.
pub const SET_VOLTAGE_VALUE: &str = "set voltage value";
/// __R/W__ - Current setting, `52428` is nominal.
pub const SET_CURRENT_VALUE: &str = "set current value";
/// __R__ - Status word, see [`DeviceState`](crate::types::DeviceState).
pub const DEVICE_STATE: &str = "device state";
/// __R__ - Measured output voltage, `0xCCCC` is nominal.
pub const ACTUAL_VOLTAGE: &str = "actual voltage";
/// __R__ - Measured output current, `0xCCCC` is nominal.
pub const ACTUAL_CURRENT: &str = "actual current";

/// Registers a session cannot work without.
pub const REQUIRED: [&str; 11] = [
    MANUFACTURER,
    DEVICE_TYPE,
    SERIAL_NUMBER,
    NOMINAL_VOLTAGE,
    NOMINAL_CURRENT,
    REMOTE_MODE,
    SET_VOLTAGE_VALUE,
    SET_CURRENT_VALUE,
    DEVICE_STATE,
    ACTUAL_VOLTAGE,
    ACTUAL_CURRENT,
];

/// `(description, modbus address, data type, data length in bytes)`
const EA_REGISTERS: &[(&str, u16, DataType, u16)] = &[
    ("device class", 0, DataType::UInt16, 2),
    (DEVICE_TYPE, 1, DataType::Text, 40),
    (SERIAL_NUMBER, 151, DataType::Text, 40),
    (NOMINAL_VOLTAGE, 121, DataType::Float32, 4),
    (NOMINAL_CURRENT, 123, DataType::Float32, 4),
    ("nominal power", 125, DataType::Float32, 4),
    (MANUFACTURER, 171, DataType::Text, 40),
    (REMOTE_MODE, 402, DataType::UInt16, 2),
    ("DC output", 405, DataType::UInt16, 2),
    (SET_VOLTAGE_VALUE, 500, DataType::UInt16, 2),
    (SET_CURRENT_VALUE, 501, DataType::UInt16, 2),
    ("set power value", 502, DataType::UInt16, 2),
    (DEVICE_STATE, 505, DataType::UInt32, 4),
    (ACTUAL_VOLTAGE, 507, DataType::UInt16, 2),
    (ACTUAL_CURRENT, 508, DataType::UInt16, 2),
    ("actual power", 509, DataType::UInt16, 2),
];

impl RegisterCatalog {
    /// The built-in register table of the Elektro-Automatik PS/PSI series.
    pub fn elektro_automatik() -> Result<Self, ProtocolError> {
        let descriptors = EA_REGISTERS
            .iter()
            .map(|&(name, address, data_type, length)| {
                RegisterDescriptor::new(name, address, data_type, length)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_descriptors(descriptors)
    }
}
