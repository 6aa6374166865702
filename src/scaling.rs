//! Scaling between raw register values and physical units.
//!
//! The PSU reports and accepts voltages and currents as a fraction of the device's nominal
//! value: `physical = nominal * raw / full_scale`. The full scale values below come from the
//! programming guide and are per register, they are not derived from anything.

use crate::error::ProtocolError;

/// A raw value which corresponds to 100% of the nominal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullScale(pub u16);

/// Full scale of the actual voltage and set voltage value registers.
pub const VOLTAGE_FULL_SCALE: FullScale = FullScale(0xCCCC);
/// Full scale of the actual current register.
pub const CURRENT_FULL_SCALE: FullScale = FullScale(0xCCCC);
/// Full scale of the set current value register, documented separately in the guide.
pub const CURRENT_SETPOINT_FULL_SCALE: FullScale = FullScale(52428);

impl FullScale {
    /// Convert a raw register value to physical units.
    pub fn raw_to_physical(self, nominal: f32, raw: u16) -> f32 {
        (nominal as f64 * raw as f64 / self.0 as f64) as f32
    }

    /// Convert a physical value to the raw register value, truncating.
    ///
    /// Fails if `value` isn't within `[0, nominal]`.
    pub fn physical_to_raw(self, nominal: f32, value: f32) -> Result<u16, ProtocolError> {
        if !(0.0..=nominal).contains(&value) {
            return Err(ProtocolError::OutOfRange {
                value,
                min: 0.0,
                max: nominal,
            });
        }
        if nominal <= 0.0 {
            return Ok(0);
        }
        let raw = self.0 as f64 * value as f64 / nominal as f64;
        Ok(raw as u16)
    }

    /// Smallest change in physical units the register can represent.
    pub fn quantization_step(self, nominal: f32) -> f32 {
        nominal / self.0 as f32
    }
}
