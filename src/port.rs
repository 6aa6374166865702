//! Adapter to drive a PSU through a port opened with the `serialport` crate.

use std::time::Duration;

use serialport::SerialPort;

/// Baud rate used by the PSU's USB virtual COM port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// The PSU can take a while to respond, a reasonably large time out is required.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);

/// A serial port usable as an [`embedded_io`] interface.
pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl PortWrapper {
    /// Open `path` with the PSU's default settings.
    pub fn open(path: &str) -> Result<Self, serialport::Error> {
        Self::open_with(path, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT)
    }

    pub fn open_with(
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, serialport::Error> {
        log::debug!("Opening {path} at {baud_rate} baud");
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        Ok(Self(port))
    }
}

impl From<Box<dyn SerialPort>> for PortWrapper {
    fn from(port: Box<dyn SerialPort>) -> Self {
        Self(port)
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}
