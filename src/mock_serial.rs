//! We use this mocking module in unit tests to emulate a serial port with scripted responses.

use crate::crc::crc16;

/// Append the CRC to a frame body, for building scripted responses.
pub fn with_crc(body: &[u8]) -> Vec<u8> {
    let (lo, hi) = crc16(body);
    let mut frame = body.to_vec();
    frame.extend_from_slice(&[lo, hi]);
    frame
}

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, 1024>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, 1024>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Nothing left to read before the (simulated) timeout.
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Queue bytes to be returned by later reads, after anything already queued.
    pub fn queue_response(&mut self, data: &[u8]) {
        self.read_buffer
            .extend_from_slice(data)
            .expect("mock read buffer overflow");
    }

    /// Queue a frame body with its CRC appended.
    pub fn queue_frame(&mut self, body: &[u8]) {
        self.queue_response(&with_crc(body));
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Number of queued bytes nobody has read yet.
    pub fn unread(&self) -> usize {
        self.read_buffer.len() - self.read_position
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_multiple_times() {
        let mut mock = MockSerial::new();
        mock.write_all(b"Hello, ").unwrap();
        mock.write_all(b"World!").unwrap();
        assert_eq!(mock.written_data(), b"Hello, World!");
        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_queued_responses_read_in_order() {
        let mut mock = MockSerial::new();
        mock.queue_response(&[1, 2, 3]);
        mock.queue_response(&[4, 5]);
        let mut buf = [0u8; 4];
        assert_eq!(mock.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(mock.unread(), 1);
        assert_eq!(mock.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn test_drained_read_times_out() {
        let mut mock = MockSerial::new();
        let mut buf = [0u8; 4];
        let err = mock.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), embedded_io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_simulated_errors() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(mock.write(b"x").is_err());
        assert!(mock.flush().is_err());
        mock.set_read_error(true);
        mock.queue_response(&[1]);
        assert!(matches!(
            mock.read(&mut [0u8; 1]),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_with_crc() {
        assert_eq!(
            with_crc(&[0x01, 0x03, 0x02, 0x56, 0x78]),
            [0x01, 0x03, 0x02, 0x56, 0x78, 0x87, 0xC6]
        );
    }
}
