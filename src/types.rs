//! This module contains types relevant to the PSU Modbus data types.

use modular_bitfield::prelude::*;

/// Who is allowed to change the PSU's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Settings are only changeable from the front panel.
    #[default]
    Local,
    /// Settings are changeable over the interface.
    Remote,
}

impl From<bool> for ControlMode {
    fn from(remote: bool) -> Self {
        if remote {
            ControlMode::Remote
        } else {
            ControlMode::Local
        }
    }
}

impl From<ControlMode> for bool {
    fn from(value: ControlMode) -> Self {
        matches!(value, ControlMode::Remote)
    }
}

/// The "device state" status word.
///
/// Only the remote control bit is interpreted, the others differ between device series.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct DeviceState {
    #[skip]
    __: B11,
    /// Bit 11, set while remote control is active.
    pub remote: bool,
    #[skip]
    __: B20,
}

impl From<u32> for DeviceState {
    fn from(value: u32) -> Self {
        DeviceState::from_bytes(value.to_le_bytes())
    }
}

impl DeviceState {
    pub fn control_mode(&self) -> ControlMode {
        ControlMode::from(self.remote())
    }
}
