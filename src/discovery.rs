//! Finding the Elektro-Automatik supplies connected over USB.

use serialport::{SerialPortInfo, SerialPortType};

/// Manufacturer string the supplies report over USB.
pub const MANUFACTURER: &str = "Elektro-Automatik";

/// A connected supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub description: Option<String>,
    /// Port name to open, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    pub serial_number: Option<String>,
}

/// List every serial port belonging to an Elektro-Automatik device.
pub fn find_devices() -> Result<Vec<DeviceInfo>, serialport::Error> {
    let ports = serialport::available_ports()?;
    let devices: Vec<DeviceInfo> = ports.into_iter().filter_map(device_info).collect();
    log::debug!("Found {} Elektro-Automatik device(s)", devices.len());
    Ok(devices)
}

fn device_info(port: SerialPortInfo) -> Option<DeviceInfo> {
    let SerialPortType::UsbPort(usb) = port.port_type else {
        return None;
    };
    let manufacturer = usb.manufacturer?;
    if !manufacturer.contains(MANUFACTURER) {
        return None;
    }
    Some(DeviceInfo {
        manufacturer,
        description: usb.product,
        port: port.port_name,
        serial_number: usb.serial_number,
    })
}
