//! Serial port transport for the device UART.

use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, instrument, warn};

use super::{Transport, TransportError};

/// Serial port configuration. The device link is always 8N1 without flow
/// control; only speed and read timeout vary.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// How long a read blocks before reporting a timeout
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: crate::DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(100),
        }
    }
}

/// Open serial port, not yet handed to a link.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the named port (e.g. `/dev/ttyACM0`, `COM4`).
    #[instrument(level = "info", skip(config), fields(baud = config.baud_rate))]
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()?;
        debug!("serial port opened");
        Ok(Self { port })
    }

    /// Names of the serial ports present on this machine.
    pub fn available_ports() -> Result<Vec<String>, TransportError> {
        let ports = serialport::available_ports().inspect_err(|err| {
            warn!(error = %err, "serial port enumeration failed");
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    /// Name of the open port, if the platform reports one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish_non_exhaustive()
    }
}

impl Transport for SerialTransport {
    type Reader = Box<dyn SerialPort>;
    type Writer = Box<dyn SerialPort>;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError> {
        let writer = self.port.try_clone()?;
        Ok((self.port, writer))
    }
}
