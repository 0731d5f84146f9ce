use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::core::Result;

/// Byte-level serial link to the radio module (8N1).
///
/// The driver opens the channel for every transaction and closes it again
/// afterwards, so implementations must tolerate repeated open/close cycles.
pub trait SerialChannel {
    /// Opens the channel at `bit_rate`, discarding stale input
    fn open(&mut self, bit_rate: u32) -> Result<()>;

    /// Writes one byte
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Number of bytes ready to read
    fn available(&mut self) -> Result<usize>;

    /// Reads one byte, `None` when nothing arrived
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Releases the channel
    fn close(&mut self);
}

/// Serial channel backed by an OS serial device
pub struct SerialPortChannel {
    /// Device path such as `/dev/ttyUSB0`
    path: String,
    /// Open port, present only during a transaction
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortChannel {
    /// Creates a channel for the device at `path`; nothing is opened yet
    pub fn new(path: impl Into<String>) -> Self {
        SerialPortChannel {
            path: path.into(),
            port: None,
        }
    }

    /// Device path of this channel
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial channel not open").into())
    }
}

impl SerialChannel for SerialPortChannel {
    fn open(&mut self, bit_rate: u32) -> Result<()> {
        let port = serialport::new(&self.path, bit_rate)
            .timeout(Duration::from_millis(10))
            .open()?;
        port.clear(ClearBuffer::Input)?;
        self.port = Some(port);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let port = self.port()?;
        port.write_all(&[byte])?;
        port.flush()?;
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port()?.read(&mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        self.port = None;
    }
}
