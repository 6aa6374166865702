use std::sync::Arc;

use embedded_io::Error as _;

use crate::{
    catalog::RegisterCatalog,
    codec::{self, RegisterValue, RegisterWords},
    crc::check_crc,
    error::{Error, ProtocolError, Result},
    frame::{self, DEVICE_ADDRESS, FunctionCode},
    registers::{
        ACTUAL_CURRENT, ACTUAL_VOLTAGE, DEVICE_STATE, DEVICE_TYPE, MANUFACTURER, NOMINAL_CURRENT,
        NOMINAL_VOLTAGE, REMOTE_MODE, REQUIRED, SERIAL_NUMBER, SET_CURRENT_VALUE,
        SET_VOLTAGE_VALUE,
    },
    scaling::{CURRENT_FULL_SCALE, CURRENT_SETPOINT_FULL_SCALE, FullScale, VOLTAGE_FULL_SCALE},
    types::{ControlMode, DeviceState},
};

/// Length of an exception response: address, function, exception code and CRC.
const EXCEPTION_LEN: usize = 5;

/// You can create a PowerSupply using any interface which implements [embedded_io::Read] & [embedded_io::Write].
///
/// The interface should be configured with a read timeout, a read which times out is reported
/// as [`Error::Timeout`]. Requests are strictly sequential, every method takes `&mut self` so a
/// session shared between threads has to sit behind a mutex.
///
/// For it's methods, we generally use the nomenclature that "set" meant to write a configuration and "get" means to read
/// back a configuration value. Where as "read" means to get a measured value.
///
/// `L` is the capacity of the frame buffers, large enough for any response by default.
pub struct PowerSupply<S: embedded_io::Read + embedded_io::Write, const L: usize = 256> {
    interface: S,
    catalog: Arc<RegisterCatalog>,
    /// Last control mode we asked for.
    control_mode: ControlMode,
    nominal_voltage: Option<f32>,
    nominal_current: Option<f32>,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> PowerSupply<S, L> {
    /// Start a session, switching the PSU to remote control.
    ///
    /// Fails if `catalog` lacks any of the registers this driver relies on.
    pub fn new(interface: S, catalog: Arc<RegisterCatalog>) -> Result<Self, S::Error> {
        catalog.require(&REQUIRED)?;
        let mut psu = Self {
            interface,
            catalog,
            control_mode: ControlMode::Local,
            nominal_voltage: None,
            nominal_current: None,
        };
        psu.set_remote_mode(true)?;
        Ok(psu)
    }

    /// Start a session using the built-in Elektro-Automatik register table.
    pub fn with_default_catalog(interface: S) -> Result<Self, S::Error> {
        let catalog = RegisterCatalog::elektro_automatik()?.shared();
        Self::new(interface, catalog)
    }

    /// Swap to a new interface, e.g. after the port was reopened, and switch to remote control again.
    ///
    /// Cached nominal values are forgotten. Returns the previous interface.
    pub fn reconnect(&mut self, interface: S) -> Result<S, S::Error> {
        let previous = core::mem::replace(&mut self.interface, interface);
        self.nominal_voltage = None;
        self.nominal_current = None;
        self.control_mode = ControlMode::Local;
        log::info!("Reconnected, re-enabling remote control");
        self.set_remote_mode(true)?;
        Ok(previous)
    }

    /// End the session, handing back the interface.
    pub fn release(self) -> S {
        self.interface
    }

    pub fn catalog(&self) -> &Arc<RegisterCatalog> {
        &self.catalog
    }

    /// Read register `name` and decode it according to its type.
    pub fn read(&mut self, name: &str) -> Result<RegisterValue, S::Error> {
        let catalog = Arc::clone(&self.catalog);
        let descriptor = catalog.lookup(name)?;
        let registers =
            self.read_modbus_registers(descriptor.address(), descriptor.register_count())?;
        Ok(codec::decode(descriptor, &registers)?)
    }

    /// Write `value` to register `name`.
    ///
    /// Only 16 bit registers can be written, anything else fails with
    /// [`ProtocolError::UnsupportedType`].
    pub fn write(&mut self, name: &str, value: impl Into<RegisterValue>) -> Result<(), S::Error> {
        let catalog = Arc::clone(&self.catalog);
        let descriptor = catalog.lookup(name)?;
        let words = codec::encode(descriptor, &value.into())?;
        self.write_words(descriptor.address(), &words)
    }

    /// Write an integer to 16 bit register `name`, it must be within `[0, 65536)`.
    pub fn write_u16(&mut self, name: &str, value: u32) -> Result<(), S::Error> {
        let catalog = Arc::clone(&self.catalog);
        let descriptor = catalog.lookup(name)?;
        let words = codec::encode_u32(descriptor, value)?;
        self.write_words(descriptor.address(), &words)
    }

    /// Switch coil `name` on or off.
    ///
    /// The PSU's coils don't follow the standard register protocol, so these frames are built by hand.
    pub fn write_coil(&mut self, name: &str, on: bool) -> Result<(), S::Error> {
        let catalog = Arc::clone(&self.catalog);
        let descriptor = catalog.lookup(name)?;
        let request = frame::build_frame(
            FunctionCode::WriteSingleCoil,
            descriptor.address(),
            &frame::coil_payload(on),
        )?;
        self.write_modbus_echoed(&request)
    }

    /// Enable or disable remote control.
    pub fn set_remote_mode(&mut self, enable: bool) -> Result<(), S::Error> {
        self.write_coil(REMOTE_MODE, enable)?;
        self.control_mode = ControlMode::from(enable);
        log::info!("Switched PSU to {:?} control", self.control_mode);
        Ok(())
    }

    /// The control mode last requested through this session.
    ///
    /// See [`Self::is_remote`] for what the device itself reports.
    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    /// Read the device state status word.
    pub fn read_device_state(&mut self) -> Result<DeviceState, S::Error> {
        let value = self.read(DEVICE_STATE)?;
        let raw = value
            .as_u32()
            .ok_or_else(|| unexpected_type(DEVICE_STATE, &value))?;
        Ok(DeviceState::from(raw))
    }

    /// Whether the PSU reports remote control as active.
    pub fn is_remote(&mut self) -> Result<bool, S::Error> {
        Ok(self.read_device_state()?.remote())
    }

    /// Manufacturer, device model and serial number.
    pub fn idn(&mut self) -> Result<String, S::Error> {
        let manufacturer = self.read(MANUFACTURER)?;
        let device_type = self.read(DEVICE_TYPE)?;
        let serial_number = self.read(SERIAL_NUMBER)?;
        Ok(format!(
            "{manufacturer}, {device_type}, serial No. {serial_number}"
        ))
    }

    /// Nominal voltage in volts. Read once, then cached for the session.
    pub fn nominal_voltage(&mut self) -> Result<f32, S::Error> {
        if let Some(volts) = self.nominal_voltage {
            return Ok(volts);
        }
        let volts = self.read_number(NOMINAL_VOLTAGE)?;
        self.nominal_voltage = Some(volts);
        Ok(volts)
    }

    /// Nominal current in amps. Read once, then cached for the session.
    pub fn nominal_current(&mut self) -> Result<f32, S::Error> {
        if let Some(amps) = self.nominal_current {
            return Ok(amps);
        }
        let amps = self.read_number(NOMINAL_CURRENT)?;
        self.nominal_current = Some(amps);
        Ok(amps)
    }

    /// Return the measured output voltage in volts.
    pub fn read_voltage(&mut self) -> Result<f32, S::Error> {
        let nominal = self.nominal_voltage()?;
        self.read_scaled(ACTUAL_VOLTAGE, nominal, VOLTAGE_FULL_SCALE)
    }

    /// Return the measured output current in amps.
    pub fn read_current(&mut self) -> Result<f32, S::Error> {
        let nominal = self.nominal_current()?;
        self.read_scaled(ACTUAL_CURRENT, nominal, CURRENT_FULL_SCALE)
    }

    /// Get the output target voltage in volts.
    pub fn get_voltage_setpoint(&mut self) -> Result<f32, S::Error> {
        let nominal = self.nominal_voltage()?;
        self.read_scaled(SET_VOLTAGE_VALUE, nominal, VOLTAGE_FULL_SCALE)
    }

    /// Set the output target voltage in volts, between zero and the nominal voltage.
    pub fn set_voltage_setpoint(&mut self, volts: f32) -> Result<(), S::Error> {
        let nominal = self.nominal_voltage()?;
        let raw = VOLTAGE_FULL_SCALE.physical_to_raw(nominal, volts)?;
        self.write(SET_VOLTAGE_VALUE, raw)
    }

    /// Get the output current limit in amps.
    pub fn get_current_setpoint(&mut self) -> Result<f32, S::Error> {
        let nominal = self.nominal_current()?;
        self.read_scaled(SET_CURRENT_VALUE, nominal, CURRENT_SETPOINT_FULL_SCALE)
    }

    /// Set the output current limit in amps, between zero and the nominal current.
    pub fn set_current_setpoint(&mut self, amps: f32) -> Result<(), S::Error> {
        let nominal = self.nominal_current()?;
        let raw = CURRENT_SETPOINT_FULL_SCALE.physical_to_raw(nominal, amps)?;
        self.write(SET_CURRENT_VALUE, raw)
    }

    fn read_number(&mut self, name: &str) -> Result<f32, S::Error> {
        let value = self.read(name)?;
        value
            .as_f32()
            .ok_or_else(|| unexpected_type(name, &value).into())
    }

    fn read_scaled(&mut self, name: &str, nominal: f32, scale: FullScale) -> Result<f32, S::Error> {
        match self.read(name)? {
            RegisterValue::UInt16(raw) => Ok(scale.raw_to_physical(nominal, raw)),
            other => Err(unexpected_type(name, &other).into()),
        }
    }

    fn write_words(&mut self, start_register: u16, words: &[u16]) -> Result<(), S::Error> {
        for (offset, &word) in (0u16..).zip(words) {
            self.write_modbus_single(start_register + offset, word)?;
        }
        Ok(())
    }

    /// Write to a single register of the PSU.
    pub fn write_modbus_single(&mut self, register: u16, data: u16) -> Result<(), S::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = rmodbus::client::ModbusRequest::new(DEVICE_ADDRESS, rmodbus::ModbusProto::Rtu);
        req.generate_set_holding(register, data, &mut request)?;
        self.write_modbus_echoed(&request)
    }

    /// Read `count` consecutive registers from the PSU.
    pub fn read_modbus_registers(
        &mut self,
        start_register: u16,
        count: u16,
    ) -> Result<RegisterWords, S::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = rmodbus::client::ModbusRequest::new(DEVICE_ADDRESS, rmodbus::ModbusProto::Rtu);
        req.generate_get_holdings(start_register, count, &mut request)?;

        // unit_id + function + byte_count + data + crc
        let response = self.transact(&request, 5 + 2 * count as usize)?;

        let mut registers = RegisterWords::new();
        req.parse_u16(&response, &mut registers)?;
        if registers.len() != count as usize {
            log::warn!(
                "Asked for {} registers at {}, got {}",
                count,
                start_register,
                registers.len()
            );
            return Err(Error::InvalidResponse);
        }
        Ok(registers)
    }

    /// Send a write request whose response has to echo it.
    fn write_modbus_echoed(&mut self, request: &[u8]) -> Result<(), S::Error> {
        let response = self.transact(request, request.len())?;
        if response.as_slice() != request {
            log::warn!("Write was not echoed, got {:02X?}", response.as_slice());
            return Err(Error::InvalidResponse);
        }
        Ok(())
    }

    /// Send `request` and read back a response of `expected_len` bytes, or an exception.
    ///
    /// The response's CRC is checked before it is returned.
    fn transact(
        &mut self,
        request: &[u8],
        expected_len: usize,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        if expected_len > L {
            return Err(ProtocolError::InvalidArgument(format!(
                "response of {} bytes does not fit the {} byte buffer",
                expected_len, L
            ))
            .into());
        }

        log::debug!("TX {:02X?}", request);
        self.interface
            .write_all(request)
            .map_err(Error::SerialError)?;
        self.interface.flush().map_err(Error::SerialError)?;

        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut temp_buf = [0u8; 16];
        while response.len() < expected_len && !is_exception(&response) {
            let wanted = (expected_len - response.len()).min(temp_buf.len());
            match self.interface.read(&mut temp_buf[..wanted]) {
                // Nothing arrived before the interface gave up waiting.
                Ok(0) => return Err(Error::Timeout),
                Ok(bytes_read) => {
                    response
                        .extend_from_slice(&temp_buf[..bytes_read])
                        .map_err(|_| Error::InvalidResponse)?;
                }
                Err(e) if e.kind() == embedded_io::ErrorKind::TimedOut => {
                    return Err(Error::Timeout);
                }
                Err(e) => return Err(Error::SerialError(e)),
            }
        }
        log::debug!("RX {:02X?}", response.as_slice());

        check_crc(&response)?;
        if is_exception(&response) {
            let function = response[1] & 0x7F;
            let code = response[2];
            log::warn!("PSU rejected function {function:#04X} with exception {code:#04X}");
            return Err(Error::Exception { function, code });
        }
        Ok(response)
    }
}

fn is_exception(response: &[u8]) -> bool {
    response.len() >= EXCEPTION_LEN && response[1] & 0x80 != 0
}

fn unexpected_type(name: &str, value: &RegisterValue) -> ProtocolError {
    ProtocolError::UnsupportedType {
        register: name.into(),
        data_type: value.data_type(),
        operation: "scale",
    }
}
